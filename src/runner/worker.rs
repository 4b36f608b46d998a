//! Worker entry point
//!
//! Runs inside the one-shot job: reads the CDQ, performs detection, and
//! writes the outcome into the CDQ's configuration object.

use tracing::{info, warn};

use super::pipeline::{DetectionPipeline, DetectionRequest};
use super::RunnerError;
use crate::api::ComponentDetectionQuerySpec;
use crate::bridge::{encode_error, encode_output, WorkerResult};
use crate::cluster::{ClusterError, ClusterHandles, SecretStore};
use crate::error::DetectionError;

/// Resolve credentials and run detection for `spec`.
///
/// Detection failures come back as [`WorkerResult::Failed`]; only cluster
/// access errors are returned as `Err`.
pub async fn run_detection(
    pipeline: &DetectionPipeline,
    secrets: &dyn SecretStore,
    namespace: &str,
    spec: &ComponentDetectionQuerySpec,
) -> Result<WorkerResult, ClusterError> {
    let token = match spec.secret() {
        None => None,
        Some(secret) => match secrets.password(namespace, secret).await? {
            Some(password) => Some(String::from_utf8_lossy(&password).trim().to_string()),
            None => {
                return Ok(WorkerResult::Failed(DetectionError::secret_not_found(
                    secret,
                )))
            }
        },
    };

    let request = DetectionRequest::from_spec(spec, token);
    Ok(match pipeline.run(&request).await {
        Ok(output) => WorkerResult::Succeeded(output),
        Err(err) => WorkerResult::Failed(err),
    })
}

/// Analyse the CDQ `namespace/name` and publish the result
pub async fn run_worker(
    cluster: &ClusterHandles,
    pipeline: &DetectionPipeline,
    namespace: &str,
    name: &str,
) -> Result<(), RunnerError> {
    let Some(cdq) = cluster.cdqs.get(namespace, name).await? else {
        warn!(namespace, name, "ComponentDetectionQuery no longer exists, nothing to analyse");
        return Ok(());
    };

    let data = match run_detection(pipeline, cluster.secrets.as_ref(), namespace, &cdq.spec).await? {
        WorkerResult::Failed(err) => {
            warn!(namespace, name, tag = %err.tag(), "Detection failed: {}", err.developer_message());
            encode_error(&err)?
        }
        WorkerResult::Succeeded(output) => {
            info!(namespace, name, "Detection succeeded");
            encode_output(&output)?
        }
        WorkerResult::Pending => return Ok(()),
    };

    cluster.configs.write(namespace, name, data).await?;
    Ok(())
}
