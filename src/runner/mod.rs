//! Analysis runner
//!
//! Runs detection for a CDQ either in-process or in a one-shot worker job
//! that reports back through the CDQ's configuration object. Local mode
//! applies when the run-local annotation says so, or when the annotation is
//! absent and the controller is configured to run locally.

pub mod job;
pub mod pipeline;
pub mod worker;

use std::sync::Arc;

use kube::ResourceExt;
use thiserror::Error;
use tracing::{debug, info};

pub use job::{job_name, JobSettings};
pub use pipeline::{DetectionPipeline, DetectionRequest};
pub use worker::{run_detection, run_worker};

use crate::api::ComponentDetectionQuery;
use crate::bridge::{self, BridgeError, WorkerResult};
use crate::cluster::{ClusterError, ClusterHandles};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("ComponentDetectionQuery {0} has no namespace")]
    MissingNamespace(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Local,
    Offloaded,
}

pub struct AnalysisRunner {
    pipeline: Arc<DetectionPipeline>,
    cluster: ClusterHandles,
    run_locally: bool,
    job: JobSettings,
}

impl AnalysisRunner {
    pub fn new(
        pipeline: Arc<DetectionPipeline>,
        cluster: ClusterHandles,
        run_locally: bool,
        job: JobSettings,
    ) -> Self {
        Self {
            pipeline,
            cluster,
            run_locally,
            job,
        }
    }

    /// The annotation, when present, overrides the configured default
    pub fn mode_for(&self, cdq: &ComponentDetectionQuery) -> RunMode {
        if cdq.run_local_annotation().unwrap_or(self.run_locally) {
            RunMode::Local
        } else {
            RunMode::Offloaded
        }
    }

    /// Run or poll detection for `cdq`.
    ///
    /// Offloaded runs return [`WorkerResult::Pending`] until the worker has
    /// written its result; calling again is safe.
    pub async fn run(&self, cdq: &ComponentDetectionQuery) -> Result<WorkerResult, RunnerError> {
        let name = cdq.name_any();
        let namespace = cdq
            .namespace()
            .ok_or_else(|| RunnerError::MissingNamespace(name.clone()))?;

        match self.mode_for(cdq) {
            RunMode::Local => {
                debug!(namespace = %namespace, name = %name, "Running detection in-process");
                Ok(run_detection(
                    &self.pipeline,
                    self.cluster.secrets.as_ref(),
                    &namespace,
                    &cdq.spec,
                )
                .await?)
            }
            RunMode::Offloaded => self.poll_worker(cdq, &namespace, &name).await,
        }
    }

    async fn poll_worker(
        &self,
        cdq: &ComponentDetectionQuery,
        namespace: &str,
        name: &str,
    ) -> Result<WorkerResult, RunnerError> {
        if let Some(data) = self.cluster.configs.get(namespace, name).await? {
            match bridge::decode(&data) {
                Ok(WorkerResult::Pending) => {}
                Ok(result) => return Ok(result),
                Err(err) => return Ok(WorkerResult::Failed(err.into())),
            }
        }

        self.cluster
            .configs
            .create(&job::config_template(cdq, &self.job.label))
            .await?;
        if !self.cluster.jobs.exists(namespace, &job_name(name)).await? {
            info!(namespace, name, "Launching analysis worker");
            self.cluster
                .jobs
                .launch(&job::worker_job(cdq, &self.job))
                .await?;
        }
        Ok(WorkerResult::Pending)
    }

    /// Remove the configuration object and worker job; absent objects are fine
    pub async fn cleanup(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.cluster.configs.delete(namespace, name).await?;
        self.cluster.jobs.delete(namespace, &job_name(name)).await
    }
}
