//! # cdq-controller
//!
//! Kubernetes controller for `ComponentDetectionQuery` resources. Given a
//! GitHub repository, it locates devfiles and Dockerfiles, matches devfile
//! registry stacks for components without one, and records the proposed
//! components on the resource's status.
//!
//! ## Modules
//!
//! - `api` - CRD types and status conditions
//! - `git` - GitHub URL parsing and shallow clones
//! - `subprocess` - Process execution abstraction used for git
//! - `devfile` - Devfile schema, artifact location and override fetches
//! - `analyzer` - Language, framework and port detection
//! - `resolver` - Merge of located and matched artifacts into components
//! - `runner` - Detection pipeline, worker jobs and the worker entry point
//! - `bridge` - Worker results encoded into configuration objects
//! - `cluster` - API server access behind traits, plus an in-memory cluster
//! - `controller` - Reconciler state machine and controller loop
//! - `error` - Detection error taxonomy
//! - `metrics` - Detection request counters
//! - `app` - Configuration, logging and fatal error handling
pub mod analyzer;
pub mod api;
pub mod app;
pub mod bridge;
pub mod cluster;
pub mod controller;
pub mod devfile;
pub mod error;
pub mod git;
pub mod metrics;
pub mod resolver;
pub mod runner;
pub mod subprocess;

use std::sync::Arc;

use app::ControllerConfig;
use devfile::{FetchError, HttpFetcher};
use git::GitCloner;
use runner::DetectionPipeline;
use subprocess::SubprocessManager;

/// Detection pipeline backed by the `git` binary and HTTP
pub fn production_pipeline(config: &ControllerConfig) -> Result<DetectionPipeline, FetchError> {
    let subprocess = SubprocessManager::production();
    Ok(DetectionPipeline::new(
        Arc::new(GitCloner::new(subprocess.runner(), config.git_timeout)),
        Arc::new(HttpFetcher::new(config.http_timeout)?),
        analyzer::ProjectAnalyzer::new(&config.registry_url),
    ))
}
