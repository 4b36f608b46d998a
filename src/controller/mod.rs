//! ComponentDetectionQuery controller
//!
//! Wires the reconciler into a kube-runtime [`Controller`] watching CDQs
//! and the configuration objects and jobs they own.

pub mod error;
pub mod reconciler;
pub mod status;


use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::{watcher, Controller};
use kube::{Api, Client};
use tracing::{debug, info, warn};

pub use error::ControllerError;
pub use reconciler::{error_policy, reconcile};

use crate::api::ComponentDetectionQuery;
use crate::app::ControllerConfig;
use crate::cluster::ClusterHandles;
use crate::metrics::DetectionMetrics;
use crate::runner::AnalysisRunner;

/// Reconcile timings and limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    pub worker_poll_interval: Duration,
    pub error_requeue_interval: Duration,
    pub status_update_retries: u32,
}

impl From<&ControllerConfig> for ReconcileSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            worker_poll_interval: config.worker_poll_interval,
            error_requeue_interval: config.error_requeue_interval,
            status_update_retries: config.status_update_retries,
        }
    }
}

/// Shared state for every reconcile
pub struct Context {
    pub cluster: ClusterHandles,
    pub runner: AnalysisRunner,
    pub metrics: DetectionMetrics,
    pub settings: ReconcileSettings,
}

/// Run the controller until a termination signal arrives
pub async fn run(client: Client, ctx: Arc<Context>, side_object_label: &str) {
    let cdqs = Api::<ComponentDetectionQuery>::all(client.clone());
    let configs = Api::<ConfigMap>::all(client.clone());
    let jobs = Api::<Job>::all(client);
    let owned = watcher::Config::default().labels(side_object_label);

    info!("Starting ComponentDetectionQuery controller");
    Controller::new(cdqs, watcher::Config::default())
        .owns(configs, owned.clone())
        .owns(jobs, owned)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!("Reconciled {}", object.name),
                Err(e) => warn!("Reconcile error: {}", e),
            }
        })
        .await;
    info!("Controller stopped");
}
