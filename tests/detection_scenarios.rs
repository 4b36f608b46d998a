//! End-to-end detection through the reconciler against fixture repositories

mod common;

use common::*;
use std::collections::BTreeMap;

use cdq_controller::api::{ConditionStatus, RUN_LOCAL_ANNOTATION};
use cdq_controller::devfile::StaticFetcher;
use cdq_controller::metrics::{FAILED_REQUESTS, SUCCEEDED_REQUESTS, TOTAL_REQUESTS};
use cdq_controller::runner::run_worker;
use kube::runtime::controller::Action;

const SPRINGBOOT_URL: &str = "https://github.com/devfile-samples/devfile-sample-java-springboot-basic";
const MULTI_URL: &str = "https://github.com/devfile-resources/multi-components-none";

#[tokio::test]
async fn test_springboot_single_component() {
    let git = FixtureGit::new().host(
        "devfile-samples/devfile-sample-java-springboot-basic",
        "main",
        springboot_repo(),
    );
    let env = TestEnv::local(git).await;
    env.create("springboot", spec(SPRINGBOOT_URL));

    assert_eq!(env.reconcile("springboot").await, Action::await_change());

    let status = env.status("springboot");
    let terminal = status.conditions.iter().find(|c| c.is_terminal()).unwrap();
    assert_eq!(terminal.status, ConditionStatus::True);
    assert_eq!(terminal.message, "ComponentDetectionQuery has successfully finished");

    assert_eq!(status.component_detected.len(), 1);
    let component = &status.component_detected["devfile-sample-java-springboot-basic"];
    assert!(component.devfile_found);
    assert_eq!(component.target_port, 8081);
    assert_eq!(component.project_type.as_deref(), Some("springboot"));

    let source = &component.source.git_source;
    assert_eq!(source.url, SPRINGBOOT_URL);
    assert_eq!(source.context, "./");
    assert_eq!(source.revision, "main");
    assert_eq!(
        source.devfile_url.as_deref(),
        Some("https://raw.githubusercontent.com/devfile-samples/devfile-sample-java-springboot-basic/main/devfile.yaml")
    );
    assert_eq!(source.dockerfile_url.as_deref(), Some("docker/Dockerfile"));

    assert_eq!(env.collector.counter(SUCCEEDED_REQUESTS).await, 1);
}

#[tokio::test]
async fn test_repository_without_components() {
    let git = FixtureGit::new().host(
        "octocat/Hello-World",
        "master",
        RepoFixture::new().with_file("README", "Hello World!\n"),
    );
    let env = TestEnv::local(git.clone()).await;
    let mut hello = spec("https://github.com/octocat/Hello-World");
    hello.revision = Some("master".into());
    env.create("hello", hello);

    env.reconcile("hello").await;

    let status = env.status("hello");
    let terminal = status.conditions.iter().find(|c| c.is_terminal()).unwrap();
    assert_eq!(terminal.status, ConditionStatus::True);
    assert!(terminal.message.contains("successfully finished"));
    assert!(status.component_detected.is_empty());
    assert_eq!(git.fetches(), vec![("master".to_string(), None)]);
}

#[tokio::test]
async fn test_multi_component_repository_without_devfiles() {
    let git = FixtureGit::new().host(
        "devfile-resources/multi-components-none",
        "main",
        multi_component_repo(),
    );
    let env = TestEnv::local(git).await;
    let mut multi = spec(MULTI_URL);
    multi.is_multi_component = true;
    env.create("multi", multi);

    env.reconcile("multi").await;

    let status = env.status("multi");
    assert_eq!(status.component_detected.len(), 2);

    let java = &status.component_detected["devfile-sample-java-springboot-basic"];
    assert!(!java.devfile_found);
    assert_eq!(java.target_port, 8081);
    assert_eq!(
        java.source.git_source.devfile_url.as_deref(),
        Some("https://registry.devfile.io/devfiles/java-springboot")
    );
    assert_eq!(
        java.source.git_source.dockerfile_url.as_deref(),
        Some("https://raw.githubusercontent.com/devfile-samples/devfile-sample-java-springboot-basic/main/docker/Dockerfile")
    );

    let node = &status.component_detected["devfile-sample-nodejs-basic"];
    assert!(!node.devfile_found);
    assert_eq!(node.target_port, 8080);
    assert_eq!(node.source.git_source.context, "devfile-sample-nodejs-basic");
    assert_eq!(
        node.source.git_source.devfile_url.as_deref(),
        Some("https://registry.devfile.io/devfiles/nodejs")
    );
}

#[tokio::test]
async fn test_context_narrows_detection() {
    let git = FixtureGit::new().host(
        "devfile-resources/multi-components-none",
        "main",
        multi_component_repo(),
    );
    let env = TestEnv::local(git).await;
    let mut nodejs = spec(MULTI_URL);
    nodejs.context = Some("devfile-sample-nodejs-basic".into());
    env.create("nodejs", nodejs);

    env.reconcile("nodejs").await;

    let status = env.status("nodejs");
    assert_eq!(status.component_detected.len(), 1);
    let component = &status.component_detected["devfile-sample-nodejs-basic"];
    assert_eq!(component.target_port, 8080);
    assert_eq!(component.source.git_source.context, "devfile-sample-nodejs-basic");
}

#[tokio::test]
async fn test_context_with_devfile_and_listening_server() {
    let git = FixtureGit::new().host(
        "devfile-resources/multi-components-devfile",
        "main",
        RepoFixture::new()
            .with_file("README.md", "# components\n")
            .with_file("nodejs/devfile.yaml", NODEJS_OUTERLOOP_DEVFILE)
            .with_file("nodejs/package.json", "{\"name\": \"nodejs\"}\n")
            .with_file(
                "nodejs/server.js",
                "const app = require('express')();\napp.listen(8080);\n",
            )
            .with_file("python/requirements.txt", "flask\n"),
    );
    let env = TestEnv::local(git).await;
    let mut nodejs = spec("https://github.com/devfile-resources/multi-components-devfile");
    nodejs.context = Some("nodejs".into());
    env.create("nodejs-devfile", nodejs);

    env.reconcile("nodejs-devfile").await;

    let status = env.status("nodejs-devfile");
    assert_eq!(status.component_detected.len(), 1);
    let component = &status.component_detected["nodejs"];
    assert!(component.devfile_found);
    assert_eq!(component.target_port, 8080);
    assert_eq!(component.source.git_source.context, "nodejs");
    assert_eq!(
        component.source.git_source.devfile_url.as_deref(),
        Some("https://raw.githubusercontent.com/devfile-resources/multi-components-devfile/main/nodejs/devfile.yaml")
    );
}

#[tokio::test]
async fn test_invalid_url_fails_without_fetching() {
    let git = FixtureGit::new();
    let env = TestEnv::local(git.clone()).await;
    env.create(
        "bad",
        spec("https://github.com/redhat-appstudio-appdata/!@#$%U%I$F  DFDN##"),
    );

    env.reconcile("bad").await;

    let status = env.status("bad");
    let terminal = status.conditions.iter().find(|c| c.is_terminal()).unwrap();
    assert_eq!(terminal.status, ConditionStatus::False);
    assert_eq!(terminal.reason, "InvalidURL");
    assert!(status.component_detected.is_empty());
    assert!(git.fetches().is_empty());
    assert_eq!(env.collector.counter(FAILED_REQUESTS).await, 1);
}

#[tokio::test]
async fn test_unsupported_host() {
    let env = TestEnv::local(FixtureGit::new()).await;
    env.create("gitlab", spec("https://gitlab.com/example/project"));

    env.reconcile("gitlab").await;

    let terminal = env
        .status("gitlab")
        .conditions
        .into_iter()
        .find(|c| c.is_terminal())
        .unwrap();
    assert_eq!(terminal.status, ConditionStatus::False);
    assert_eq!(terminal.reason, "UnsupportedHost");
}

#[tokio::test]
async fn test_private_repository_with_token() {
    let git = FixtureGit::new().host_private(
        "example/private-springboot",
        "fake-token",
        springboot_repo(),
    );
    let env = TestEnv::local(git.clone()).await;
    env.cluster.insert_secret(
        NS,
        "git-token",
        BTreeMap::from([("password".to_string(), b"fake-token\n".to_vec())]),
    );
    let mut private = spec("https://github.com/example/private-springboot");
    private.secret = Some("git-token".into());
    env.create("private", private);

    env.reconcile("private").await;

    let status = env.status("private");
    assert_eq!(status.component_detected.len(), 1);
    assert_eq!(
        git.fetches(),
        vec![("main".to_string(), Some("fake-token".to_string()))]
    );
}

#[tokio::test]
async fn test_private_repository_without_token() {
    let git = FixtureGit::new().host_private(
        "example/private-springboot",
        "fake-token",
        springboot_repo(),
    );
    let env = TestEnv::local(git).await;
    env.create("private", spec("https://github.com/example/private-springboot"));

    env.reconcile("private").await;

    let status = env.status("private");
    let terminal = status.conditions.iter().find(|c| c.is_terminal()).unwrap();
    assert_eq!(terminal.reason, "AuthenticationFailed");
    assert!(terminal.message.starts_with("ComponentDetectionQuery failed: "));
    assert!(status.component_detected.is_empty());
}

#[tokio::test]
async fn test_devfile_override_skips_clone() {
    let override_url = "https://raw.githubusercontent.com/devfile-samples/devfile-sample-java-springboot-basic/main/devfile.yaml";
    let git = FixtureGit::new().host(
        "devfile-samples/devfile-sample-java-springboot-basic",
        "main",
        springboot_repo(),
    );
    let fetcher = StaticFetcher::new().with(override_url, SPRINGBOOT_DEVFILE);
    let env = TestEnv::new(git.clone(), fetcher.clone(), true).await;
    let mut with_override = spec(SPRINGBOOT_URL);
    with_override.devfile_url = Some(override_url.into());
    env.create("override", with_override);

    env.reconcile("override").await;

    let status = env.status("override");
    let component = &status.component_detected["devfile-sample-java-springboot-basic"];
    assert!(component.devfile_found);
    assert_eq!(component.target_port, 8080);
    assert_eq!(component.source.git_source.devfile_url.as_deref(), Some(override_url));
    assert_eq!(component.source.git_source.revision, "main");
    assert_eq!(fetcher.requests(), vec![override_url.to_string()]);
    assert!(git.fetches().is_empty());
}

#[tokio::test]
async fn test_unreachable_devfile_override() {
    let env = TestEnv::local(FixtureGit::new()).await;
    let mut with_override = spec(SPRINGBOOT_URL);
    with_override.devfile_url = Some("https://example.com/missing/devfile.yaml".into());
    env.create("override", with_override);

    env.reconcile("override").await;

    let terminal = env
        .status("override")
        .conditions
        .into_iter()
        .find(|c| c.is_terminal())
        .unwrap();
    assert_eq!(terminal.status, ConditionStatus::False);
    assert_eq!(terminal.reason, "DevfileFetchFailed");
}

#[tokio::test]
async fn test_annotation_runs_offloaded_cdq_locally() {
    let git = FixtureGit::new().host(
        "devfile-samples/devfile-sample-java-springboot-basic",
        "main",
        springboot_repo(),
    );
    let env = TestEnv::new(git, StaticFetcher::new(), false).await;
    env.create("springboot", spec(SPRINGBOOT_URL));
    env.cluster
        .annotate_cdq(NS, "springboot", (RUN_LOCAL_ANNOTATION, "true"));

    assert_eq!(env.reconcile("springboot").await, Action::await_change());
    assert_eq!(env.status("springboot").component_detected.len(), 1);
    assert!(env.cluster.job(NS, "springboot-job").is_none());
}

#[tokio::test]
async fn test_offloaded_worker_job_shape() {
    let git = FixtureGit::new().host(
        "devfile-samples/devfile-sample-java-springboot-basic",
        "main",
        springboot_repo(),
    );
    let env = TestEnv::new(git, StaticFetcher::new(), false).await;
    env.create("springboot", spec(SPRINGBOOT_URL));

    env.reconcile("springboot").await;

    let job = env.cluster.job(NS, "springboot-job").unwrap();
    let pod = job.spec.unwrap().template.spec.unwrap();
    assert_eq!(pod.service_account_name.as_deref(), Some("cdq-worker"));
    assert_eq!(
        pod.containers[0].args.clone().unwrap(),
        vec!["analyze", "--namespace", NS, "--name", "springboot"]
    );

    let config = env.cluster.config_object(NS, "springboot").unwrap();
    let labels = config.metadata.labels.unwrap();
    assert_eq!(labels["appstudio.redhat.com/cdq-analysis"], "springboot");

    run_worker(&env.ctx.cluster, &env.pipeline, NS, "springboot")
        .await
        .unwrap();
    env.reconcile("springboot").await;

    let status = env.status("springboot");
    assert_eq!(status.component_detected.len(), 1);
    assert_eq!(env.collector.counter(TOTAL_REQUESTS).await, 1);
    assert!(env.cluster.job(NS, "springboot-job").is_none());
}
