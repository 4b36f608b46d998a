//! Common test utilities and helpers
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use cdq_controller::analyzer::ProjectAnalyzer;
use cdq_controller::api::{ComponentDetectionQuerySpec, ComponentDetectionQueryStatus};
use cdq_controller::cluster::{ClusterHandles, InMemoryCluster};
use cdq_controller::controller::{reconcile, Context, ReconcileSettings};
use cdq_controller::devfile::StaticFetcher;
use cdq_controller::git::{FetchedRepo, GitAccessor, GitError, GitHubRepo};
use cdq_controller::metrics::{DetectionMetrics, MemoryMetricsCollector, MetricsRegistry};
use cdq_controller::runner::{AnalysisRunner, DetectionPipeline, JobSettings};
use kube::runtime::controller::Action;

pub const NS: &str = "default";
pub const REGISTRY: &str = "https://registry.devfile.io";

pub const SPRINGBOOT_DEVFILE: &str = r#"schemaVersion: 2.2.0
metadata:
  name: java-springboot
  language: Java
  projectType: springboot
components:
  - name: tools
    container:
      image: registry.access.redhat.com/ubi8/openjdk-11:latest
      endpoints:
        - name: http-springboot
          targetPort: 8080
  - name: image-build
    image:
      imageName: java-springboot-image:latest
      dockerfile:
        uri: docker/Dockerfile
  - name: kubernetes-deploy
    kubernetes:
      uri: deploy.yaml
"#;

pub const INNERLOOP_DEVFILE: &str = r#"schemaVersion: 2.2.0
metadata:
  name: nodejs
  language: JavaScript
components:
  - name: runtime
    container:
      image: registry.access.redhat.com/ubi8/nodejs-16:latest
      endpoints:
        - name: http
          targetPort: 3000
"#;

pub const NODEJS_OUTERLOOP_DEVFILE: &str = r#"schemaVersion: 2.2.0
metadata:
  name: nodejs
  language: JavaScript
  projectType: Node.js
components:
  - name: runtime
    container:
      image: registry.access.redhat.com/ubi8/nodejs-16:latest
  - name: kubernetes-deploy
    kubernetes:
      uri: deploy.yaml
"#;

pub const NODE_SERVER: &str = r#"const express = require('express');
const app = express();
const port = process.env.PORT || 8080;
app.get('/', (req, res) => res.send('Hello'));
app.listen(port);
"#;

/// Files making up a repository tree
#[derive(Debug, Clone, Default)]
pub struct RepoFixture {
    files: Vec<(PathBuf, String)>,
}

impl RepoFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating parent directories as needed
    pub fn with_file(mut self, path: impl AsRef<Path>, content: &str) -> Self {
        self.files
            .push((path.as_ref().to_path_buf(), content.to_string()));
        self
    }

    pub fn write_to(&self, dest: &Path) -> std::io::Result<()> {
        fs::create_dir_all(dest)?;
        for (file_path, content) in &self.files {
            let full_path = dest.join(file_path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(full_path, content)?;
        }
        Ok(())
    }

    /// Materialise the tree in a fresh temporary directory
    pub fn build(&self) -> Result<TempDir> {
        let temp_dir = TempDir::new()?;
        self.write_to(temp_dir.path())?;
        Ok(temp_dir)
    }
}

struct HostedRepo {
    fixture: RepoFixture,
    default_branch: String,
    /// Token required to read the repository
    token: Option<String>,
}

/// Git host serving fixture trees by `owner/name`.
///
/// Unknown repositories and private ones read without the right token
/// fail authentication, as GitHub does over HTTPS.
#[derive(Clone, Default)]
pub struct FixtureGit {
    repos: Arc<Mutex<HashMap<String, HostedRepo>>>,
    fetches: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl FixtureGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(self, slug: &str, default_branch: &str, fixture: RepoFixture) -> Self {
        self.insert(slug, default_branch, fixture, None)
    }

    pub fn host_private(self, slug: &str, token: &str, fixture: RepoFixture) -> Self {
        self.insert(slug, "main", fixture, Some(token.to_string()))
    }

    fn insert(
        self,
        slug: &str,
        default_branch: &str,
        fixture: RepoFixture,
        token: Option<String>,
    ) -> Self {
        self.repos.lock().unwrap().insert(
            slug.to_string(),
            HostedRepo {
                fixture,
                default_branch: default_branch.to_string(),
                token,
            },
        );
        self
    }

    /// `(revision, token)` of every fetch so far
    pub fn fetches(&self) -> Vec<(String, Option<String>)> {
        self.fetches.lock().unwrap().clone()
    }

    fn authorize<T>(
        &self,
        repo: &GitHubRepo,
        token: Option<&str>,
        read: impl FnOnce(&HostedRepo) -> T,
    ) -> Result<T, GitError> {
        let repos = self.repos.lock().unwrap();
        let hosted = repos
            .get(&format!("{}/{}", repo.owner, repo.name))
            .ok_or(GitError::AuthenticationFailed)?;
        match (&hosted.token, token) {
            (None, _) => Ok(read(hosted)),
            (Some(expected), Some(given)) if expected == given => Ok(read(hosted)),
            _ => Err(GitError::AuthenticationFailed),
        }
    }
}

#[async_trait]
impl GitAccessor for FixtureGit {
    async fn fetch(
        &self,
        repo: &GitHubRepo,
        revision: Option<&str>,
        token: Option<&str>,
        dest: &Path,
    ) -> Result<FetchedRepo, GitError> {
        let (fixture, default_branch) =
            self.authorize(repo, token, |hosted| (hosted.fixture.clone(), hosted.default_branch.clone()))?;
        fixture
            .write_to(dest)
            .map_err(|e| GitError::Repository(e.to_string()))?;

        let revision = revision.map(str::to_string).unwrap_or(default_branch);
        self.fetches
            .lock()
            .unwrap()
            .push((revision.clone(), token.map(str::to_string)));
        Ok(FetchedRepo {
            root: dest.to_path_buf(),
            revision,
        })
    }

    async fn default_branch(
        &self,
        repo: &GitHubRepo,
        token: Option<&str>,
    ) -> Result<String, GitError> {
        self.authorize(repo, token, |hosted| hosted.default_branch.clone())
    }
}

/// Controller context over an in-memory cluster
pub struct TestEnv {
    pub cluster: InMemoryCluster,
    pub ctx: Arc<Context>,
    pub pipeline: Arc<DetectionPipeline>,
    pub collector: Arc<MemoryMetricsCollector>,
}

impl TestEnv {
    pub async fn new(git: FixtureGit, fetcher: StaticFetcher, run_locally: bool) -> Self {
        let cluster = InMemoryCluster::new();
        let handles = ClusterHandles::in_memory(&cluster);
        let pipeline = Arc::new(DetectionPipeline::new(
            Arc::new(git),
            Arc::new(fetcher),
            ProjectAnalyzer::new(REGISTRY),
        ));

        let registry = Arc::new(MetricsRegistry::default());
        let collector = Arc::new(MemoryMetricsCollector::new("memory"));
        registry.register_collector(collector.clone()).await;

        let ctx = Arc::new(Context {
            cluster: handles.clone(),
            runner: AnalysisRunner::new(
                pipeline.clone(),
                handles,
                run_locally,
                JobSettings {
                    image: "cdq-controller:test".into(),
                    service_account: Some("cdq-worker".into()),
                    ttl: Duration::from_secs(300),
                    label: "appstudio.redhat.com/cdq-analysis".into(),
                },
            ),
            metrics: DetectionMetrics::new(registry),
            settings: ReconcileSettings {
                worker_poll_interval: Duration::from_secs(5),
                error_requeue_interval: Duration::from_secs(10),
                status_update_retries: 3,
            },
        });

        Self {
            cluster,
            ctx,
            pipeline,
            collector,
        }
    }

    pub async fn local(git: FixtureGit) -> Self {
        Self::new(git, StaticFetcher::new(), true).await
    }

    pub fn create(&self, name: &str, spec: ComponentDetectionQuerySpec) {
        self.cluster.create_cdq(NS, name, spec);
    }

    pub async fn reconcile(&self, name: &str) -> Action {
        let cdq = self.cluster.cdq(NS, name).expect("CDQ exists");
        reconcile(Arc::new(cdq), self.ctx.clone())
            .await
            .expect("reconcile succeeds")
    }

    pub fn status(&self, name: &str) -> ComponentDetectionQueryStatus {
        self.cluster
            .cdq(NS, name)
            .and_then(|cdq| cdq.status)
            .unwrap_or_default()
    }
}

pub fn spec(url: &str) -> ComponentDetectionQuerySpec {
    ComponentDetectionQuerySpec {
        url: url.into(),
        ..Default::default()
    }
}

/// Spring Boot sample with a root devfile and Dockerfile
pub fn springboot_repo() -> RepoFixture {
    RepoFixture::new()
        .with_file("devfile.yaml", SPRINGBOOT_DEVFILE)
        .with_file(
            "docker/Dockerfile",
            "FROM registry.access.redhat.com/ubi8/openjdk-11\nEXPOSE 8081\n",
        )
        .with_file(
            "pom.xml",
            "<project><parent><artifactId>spring-boot-starter-parent</artifactId></parent></project>\n",
        )
        .with_file("src/main/resources/application.properties", "server.port=8081\n")
}

/// Two components without devfiles: a Java service and a Node.js frontend
pub fn multi_component_repo() -> RepoFixture {
    RepoFixture::new()
        .with_file("README.md", "# multi components\n")
        .with_file(
            "devfile-sample-java-springboot-basic/pom.xml",
            "<project><parent><artifactId>spring-boot-starter-parent</artifactId></parent></project>\n",
        )
        .with_file(
            "devfile-sample-java-springboot-basic/src/main/resources/application.properties",
            "server.port=8081\n",
        )
        .with_file(
            "devfile-sample-nodejs-basic/package.json",
            "{\"name\": \"nodejs-starter\", \"dependencies\": {\"express\": \"^4.17.1\"}}\n",
        )
        .with_file("devfile-sample-nodejs-basic/server.js", NODE_SERVER)
}
