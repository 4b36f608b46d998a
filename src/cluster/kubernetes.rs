//! kube-rs implementation of the cluster seams

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use kube::api::{Api, DeleteParams, ObjectMeta, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};

use super::{CdqStore, ClusterError, ConfigStore, JobLauncher, SecretStore};
use crate::api::ComponentDetectionQuery;
use crate::bridge::BinaryData;

/// Key of the secret entry holding the Git token
pub const PASSWORD_KEY: &str = "password";

#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn map_error(what: impl Into<String>, err: kube::Error) -> ClusterError {
    match &err {
        kube::Error::Api(response) if response.code == 409 => ClusterError::Conflict(what.into()),
        kube::Error::Api(response) if response.code == 404 => ClusterError::NotFound(what.into()),
        _ => ClusterError::Api(err),
    }
}

fn ignore_missing(result: Result<(), ClusterError>) -> Result<(), ClusterError> {
    match result {
        Err(ClusterError::NotFound(_)) => Ok(()),
        other => other,
    }
}

fn ignore_existing(result: Result<(), ClusterError>) -> Result<(), ClusterError> {
    match result {
        Err(ClusterError::Conflict(_)) => Ok(()),
        other => other,
    }
}

#[async_trait]
impl CdqStore for KubeCluster {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ComponentDetectionQuery>, ClusterError> {
        self.api::<ComponentDetectionQuery>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| map_error(format!("ComponentDetectionQuery {namespace}/{name}"), e))
    }

    async fn replace_status(
        &self,
        cdq: &ComponentDetectionQuery,
    ) -> Result<ComponentDetectionQuery, ClusterError> {
        let namespace = cdq.namespace().unwrap_or_default();
        let name = cdq.name_any();
        let what = format!("ComponentDetectionQuery {namespace}/{name}");
        let body = serde_json::to_vec(cdq).map_err(|e| ClusterError::Serialization(what.clone(), e))?;

        self.api::<ComponentDetectionQuery>(&namespace)
            .replace_status(&name, &PostParams::default(), body)
            .await
            .map_err(|e| map_error(what, e))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let result = self
            .api::<ComponentDetectionQuery>(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| map_error(format!("ComponentDetectionQuery {namespace}/{name}"), e));
        ignore_missing(result)
    }
}

#[async_trait]
impl ConfigStore for KubeCluster {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<BinaryData>, ClusterError> {
        let config = self
            .api::<ConfigMap>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| map_error(format!("ConfigMap {namespace}/{name}"), e))?;

        Ok(config.map(|cm| {
            cm.binary_data
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, value.0))
                .collect()
        }))
    }

    async fn create(&self, template: &ConfigMap) -> Result<(), ClusterError> {
        let namespace = template.namespace().unwrap_or_default();
        let result = self
            .api::<ConfigMap>(&namespace)
            .create(&PostParams::default(), template)
            .await
            .map(|_| ())
            .map_err(|e| map_error(format!("ConfigMap {namespace}/{}", template.name_any()), e));
        ignore_existing(result)
    }

    async fn write(
        &self,
        namespace: &str,
        name: &str,
        data: BinaryData,
    ) -> Result<(), ClusterError> {
        let what = format!("ConfigMap {namespace}/{name}");
        let config = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            binary_data: Some(
                data.into_iter()
                    .map(|(key, value)| (key, ByteString(value)))
                    .collect(),
            ),
            ..Default::default()
        };

        let api = self.api::<ConfigMap>(namespace);
        let patched = api
            .patch(name, &PatchParams::default(), &Patch::Merge(&config))
            .await
            .map(|_| ())
            .map_err(|e| map_error(what.clone(), e));

        match patched {
            Err(ClusterError::NotFound(_)) => api
                .create(&PostParams::default(), &config)
                .await
                .map(|_| ())
                .map_err(|e| map_error(what, e)),
            other => other,
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let result = self
            .api::<ConfigMap>(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| map_error(format!("ConfigMap {namespace}/{name}"), e));
        ignore_missing(result)
    }
}

#[async_trait]
impl SecretStore for KubeCluster {
    async fn password(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Vec<u8>>, ClusterError> {
        let secret = self
            .api::<Secret>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| map_error(format!("Secret {namespace}/{name}"), e))?;

        Ok(secret.map(|s| {
            s.data
                .and_then(|mut data| data.remove(PASSWORD_KEY))
                .map(|value| value.0)
                .unwrap_or_default()
        }))
    }
}

#[async_trait]
impl JobLauncher for KubeCluster {
    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, ClusterError> {
        let job = self
            .api::<Job>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| map_error(format!("Job {namespace}/{name}"), e))?;
        Ok(job.is_some())
    }

    async fn launch(&self, job: &Job) -> Result<(), ClusterError> {
        let namespace = job.namespace().unwrap_or_default();
        let result = self
            .api::<Job>(&namespace)
            .create(&PostParams::default(), job)
            .await
            .map(|_| ())
            .map_err(|e| map_error(format!("Job {namespace}/{}", job.name_any()), e));
        ignore_existing(result)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let result = self
            .api::<Job>(namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map(|_| ())
            .map_err(|e| map_error(format!("Job {namespace}/{name}"), e));
        ignore_missing(result)
    }
}
