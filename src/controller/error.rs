//! Reconcile errors
//!
//! Everything here is retried through the error policy. Detection failures
//! never surface as a `ControllerError`; they become terminal conditions.

use thiserror::Error;

use crate::cluster::ClusterError;
use crate::runner::RunnerError;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("ComponentDetectionQuery is missing {0}")]
    MissingField(&'static str),

    #[error("status of {0} still conflicting after {1} attempts")]
    ConflictRetriesExhausted(String, u32),
}

impl ControllerError {
    pub fn metric_label(&self) -> &'static str {
        match self {
            ControllerError::Cluster(_) => "cluster",
            ControllerError::Runner(_) => "runner",
            ControllerError::MissingField(_) => "missing_field",
            ControllerError::ConflictRetriesExhausted(..) => "conflict",
        }
    }
}
