//! Detection pipeline
//!
//! Git fetch, devfile location, language analysis and resolution for one
//! request. This is the boundary where module errors become
//! [`DetectionError`]s.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info};

use crate::analyzer::{AnalyzerMatch, ProjectAnalyzer};
use crate::api::ComponentDetectionQuerySpec;
use crate::devfile::locator::{context_dir, validate_context};
use crate::devfile::{locate, Devfile, DevfileFetcher, LocatedArtifacts};
use crate::error::DetectionError;
use crate::git::{GitAccessor, GitHubRepo};
use crate::resolver::{resolve, resolve_override, AnalysisOutput, ResolverInput};

/// Inputs of one detection run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionRequest {
    pub url: String,
    pub revision: Option<String>,
    /// Normalised starting context
    pub context: String,
    pub devfile_url: Option<String>,
    pub token: Option<String>,
}

impl DetectionRequest {
    pub fn from_spec(spec: &ComponentDetectionQuerySpec, token: Option<String>) -> Self {
        Self {
            url: spec.url.clone(),
            revision: spec.revision().map(str::to_string),
            context: spec.normalized_context(),
            devfile_url: spec.devfile_url().map(str::to_string),
            token,
        }
    }
}

/// Everything the analyser learned about the located contexts
#[derive(Default)]
struct Findings {
    located: LocatedArtifacts,
    matches: BTreeMap<String, AnalyzerMatch>,
    source_ports: BTreeMap<String, Vec<u16>>,
}

pub struct DetectionPipeline {
    git: Arc<dyn GitAccessor>,
    fetcher: Arc<dyn DevfileFetcher>,
    analyzer: Arc<ProjectAnalyzer>,
}

impl DetectionPipeline {
    pub fn new(
        git: Arc<dyn GitAccessor>,
        fetcher: Arc<dyn DevfileFetcher>,
        analyzer: ProjectAnalyzer,
    ) -> Self {
        Self {
            git,
            fetcher,
            analyzer: Arc::new(analyzer),
        }
    }

    pub async fn run(&self, request: &DetectionRequest) -> Result<AnalysisOutput, DetectionError> {
        let repo = GitHubRepo::parse(&request.url)?;
        validate_context(&request.context)?;
        let token = request.token.as_deref();

        if let Some(devfile_url) = request.devfile_url.as_deref() {
            return self.run_override(&repo, request, devfile_url).await;
        }

        let workdir = TempDir::new()
            .map_err(|e| DetectionError::internal(format!("creating work directory: {e}")))?;
        let fetched = self
            .git
            .fetch(&repo, request.revision.as_deref(), token, workdir.path())
            .await?;
        debug!(
            revision = %fetched.revision,
            "Fetched {}/{} into {}",
            repo.owner,
            repo.name,
            fetched.root.display()
        );

        let findings = inspect(
            self.analyzer.clone(),
            fetched.root.clone(),
            request.context.clone(),
        )
        .await?;

        let output = resolve(&ResolverInput {
            repo: &repo,
            revision: &fetched.revision,
            located: &findings.located,
            matches: &findings.matches,
            source_ports: &findings.source_ports,
        });

        info!(
            context = %request.context,
            components = output.component_contexts().len(),
            "Detection finished for {}",
            repo.url
        );
        Ok(output)
    }

    /// A user-supplied devfile replaces detection; no clone is needed
    async fn run_override(
        &self,
        repo: &GitHubRepo,
        request: &DetectionRequest,
        devfile_url: &str,
    ) -> Result<AnalysisOutput, DetectionError> {
        debug!("Using devfile override {}", devfile_url);
        let content = self.fetcher.fetch(devfile_url).await?;
        let devfile = Devfile::parse(&content).map_err(DetectionError::invalid_devfile)?;

        let revision = match request.revision.as_deref() {
            Some(rev) => rev.to_string(),
            None => {
                self.git
                    .default_branch(repo, request.token.as_deref())
                    .await?
            }
        };

        Ok(resolve_override(
            &request.context,
            devfile_url,
            content,
            &devfile,
            &revision,
        ))
    }
}

/// Locate artifacts and analyse candidates on a blocking thread
async fn inspect(
    analyzer: Arc<ProjectAnalyzer>,
    root: PathBuf,
    context: String,
) -> Result<Findings, DetectionError> {
    tokio::task::spawn_blocking(move || inspect_blocking(&analyzer, &root, &context))
        .await
        .map_err(|e| DetectionError::internal(format!("analysis task failed: {e}")))?
}

fn inspect_blocking(
    analyzer: &ProjectAnalyzer,
    root: &std::path::Path,
    context: &str,
) -> Result<Findings, DetectionError> {
    let located = locate(root, context)?;
    let mut findings = Findings::default();

    for candidate in &located.candidates {
        let dir = context_dir(root, candidate);
        if !located.devfiles.contains_key(candidate) {
            if let Some(matched) = analyzer.analyze(&dir)? {
                findings.matches.insert(candidate.clone(), matched);
                continue;
            }
        }
        let ports = analyzer.detect_ports(&dir)?;
        if !ports.is_empty() {
            findings.source_ports.insert(candidate.clone(), ports);
        }
    }

    let nothing_found = findings.matches.is_empty()
        && located.devfiles.is_empty()
        && located.dockerfiles.is_empty();
    if nothing_found && !located.single_component {
        debug!("No component below {}, analysing it directly", context);
        if let Some(matched) = analyzer.analyze(&context_dir(root, context))? {
            findings.matches.insert(context.to_string(), matched);
        }
    }

    findings.located = located;
    Ok(findings)
}
