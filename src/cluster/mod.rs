//! Cluster access behind narrow traits
//!
//! The reconciler, runner and worker only talk to the API server through
//! these seams. [`KubeCluster`] is the production implementation;
//! [`InMemoryCluster`] backs tests and local runs.

pub mod kubernetes;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::ConfigMap;
use thiserror::Error;

use crate::api::ComponentDetectionQuery;
use crate::bridge::BinaryData;

pub use kubernetes::KubeCluster;
pub use memory::InMemoryCluster;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("conflict updating {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Kubernetes API error: {0}")]
    Api(#[source] kube::Error),

    #[error("failed to serialize {0}: {1}")]
    Serialization(String, #[source] serde_json::Error),
}

impl ClusterError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClusterError::Conflict(_))
    }
}

/// ComponentDetectionQuery resources
#[async_trait]
pub trait CdqStore: Send + Sync {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ComponentDetectionQuery>, ClusterError>;

    /// Replace the status subresource; fails with `Conflict` when the
    /// resource version of `cdq` is stale
    async fn replace_status(
        &self,
        cdq: &ComponentDetectionQuery,
    ) -> Result<ComponentDetectionQuery, ClusterError>;

    /// Delete; absent resources are not an error
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
}

/// Analysis configuration objects
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<BinaryData>, ClusterError>;

    /// Create from a template; an existing object is left untouched
    async fn create(&self, template: &ConfigMap) -> Result<(), ClusterError>;

    /// Merge `data` into the object, creating it if needed
    async fn write(&self, namespace: &str, name: &str, data: BinaryData)
        -> Result<(), ClusterError>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
}

/// Credential lookup
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// The `password` key of a secret; `None` when the secret does not
    /// exist, empty when it has no such key
    async fn password(&self, namespace: &str, name: &str)
        -> Result<Option<Vec<u8>>, ClusterError>;
}

/// Worker jobs
#[async_trait]
pub trait JobLauncher: Send + Sync {
    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, ClusterError>;

    /// Create the job; an existing job with the same name is left untouched
    async fn launch(&self, job: &Job) -> Result<(), ClusterError>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
}

/// All cluster seams, cheaply cloneable
#[derive(Clone)]
pub struct ClusterHandles {
    pub cdqs: Arc<dyn CdqStore>,
    pub configs: Arc<dyn ConfigStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub jobs: Arc<dyn JobLauncher>,
}

impl ClusterHandles {
    pub fn kube(client: kube::Client) -> Self {
        Self::from_backend(Arc::new(KubeCluster::new(client)))
    }

    pub fn in_memory(cluster: &InMemoryCluster) -> Self {
        Self::from_backend(Arc::new(cluster.clone()))
    }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CdqStore + ConfigStore + SecretStore + JobLauncher + 'static,
    {
        Self {
            cdqs: backend.clone(),
            configs: backend.clone(),
            secrets: backend.clone(),
            jobs: backend,
        }
    }
}
