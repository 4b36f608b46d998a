//! In-memory cluster for tests and local runs
//!
//! Mirrors the API server behaviour the controller depends on: resource
//! versions with compare-and-swap status writes, generation bumps on spec
//! changes, and idempotent create/delete of side objects.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;

use super::{CdqStore, ClusterError, ConfigStore, JobLauncher, SecretStore};
use crate::api::{ComponentDetectionQuery, ComponentDetectionQuerySpec};
use crate::bridge::BinaryData;

type Key = (String, String);

#[derive(Default)]
struct State {
    cdqs: BTreeMap<Key, ComponentDetectionQuery>,
    configs: BTreeMap<Key, (ConfigMap, BinaryData)>,
    secrets: BTreeMap<Key, BTreeMap<String, Vec<u8>>>,
    jobs: BTreeMap<Key, Job>,
    next_version: u64,
    /// Status writes that fail with a conflict before succeeding again
    injected_conflicts: usize,
    status_writes: usize,
}

impl State {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCluster {
    state: Arc<Mutex<State>>,
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a new CDQ, assigning uid, generation and resource version
    pub fn create_cdq(
        &self,
        namespace: &str,
        name: &str,
        spec: ComponentDetectionQuerySpec,
    ) -> ComponentDetectionQuery {
        let mut cdq = ComponentDetectionQuery::new(name, spec);
        let mut state = self.state();
        cdq.metadata.namespace = Some(namespace.to_string());
        cdq.metadata.uid = Some(format!("uid-{namespace}-{name}"));
        cdq.metadata.generation = Some(1);
        cdq.metadata.resource_version = Some(state.bump());
        state.cdqs.insert(key(namespace, name), cdq.clone());
        cdq
    }

    /// Set an annotation on a stored CDQ
    pub fn annotate_cdq(&self, namespace: &str, name: &str, annotation: (&str, &str)) {
        let mut state = self.state();
        let version = state.bump();
        if let Some(cdq) = state.cdqs.get_mut(&key(namespace, name)) {
            cdq.annotations_mut()
                .insert(annotation.0.to_string(), annotation.1.to_string());
            cdq.metadata.resource_version = Some(version);
        }
    }

    /// Mutate the spec, bumping generation as the API server does
    pub fn update_spec(
        &self,
        namespace: &str,
        name: &str,
        update: impl FnOnce(&mut ComponentDetectionQuerySpec),
    ) {
        let mut state = self.state();
        let version = state.bump();
        if let Some(cdq) = state.cdqs.get_mut(&key(namespace, name)) {
            update(&mut cdq.spec);
            cdq.metadata.generation = Some(cdq.metadata.generation.unwrap_or(0) + 1);
            cdq.metadata.resource_version = Some(version);
        }
    }

    /// Set a deletion timestamp as if a delete with finalizers were pending
    pub fn mark_deleting(&self, namespace: &str, name: &str) {
        let mut state = self.state();
        let version = state.bump();
        if let Some(cdq) = state.cdqs.get_mut(&key(namespace, name)) {
            cdq.metadata.deletion_timestamp = Some(Time(Utc::now()));
            cdq.metadata.resource_version = Some(version);
        }
    }

    pub fn cdq(&self, namespace: &str, name: &str) -> Option<ComponentDetectionQuery> {
        self.state().cdqs.get(&key(namespace, name)).cloned()
    }

    pub fn insert_secret(&self, namespace: &str, name: &str, data: BTreeMap<String, Vec<u8>>) {
        self.state().secrets.insert(key(namespace, name), data);
    }

    pub fn config(&self, namespace: &str, name: &str) -> Option<BinaryData> {
        self.state()
            .configs
            .get(&key(namespace, name))
            .map(|(_, data)| data.clone())
    }

    pub fn config_object(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.state()
            .configs
            .get(&key(namespace, name))
            .map(|(object, _)| object.clone())
    }

    pub fn job(&self, namespace: &str, name: &str) -> Option<Job> {
        self.state().jobs.get(&key(namespace, name)).cloned()
    }

    /// Make the next `count` status writes fail with a conflict
    pub fn inject_status_conflicts(&self, count: usize) {
        self.state().injected_conflicts = count;
    }

    /// Successful status writes so far
    pub fn status_writes(&self) -> usize {
        self.state().status_writes
    }
}

#[async_trait]
impl CdqStore for InMemoryCluster {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ComponentDetectionQuery>, ClusterError> {
        Ok(self.cdq(namespace, name))
    }

    async fn replace_status(
        &self,
        cdq: &ComponentDetectionQuery,
    ) -> Result<ComponentDetectionQuery, ClusterError> {
        let namespace = cdq.namespace().unwrap_or_default();
        let name = cdq.name_any();
        let what = format!("ComponentDetectionQuery {namespace}/{name}");

        let mut state = self.state();
        if state.injected_conflicts > 0 {
            state.injected_conflicts -= 1;
            return Err(ClusterError::Conflict(what));
        }

        let version = state.bump();
        let stored = state
            .cdqs
            .get_mut(&key(&namespace, &name))
            .ok_or_else(|| ClusterError::NotFound(what.clone()))?;
        if stored.metadata.resource_version != cdq.metadata.resource_version {
            return Err(ClusterError::Conflict(what));
        }

        stored.status = cdq.status.clone();
        stored.metadata.resource_version = Some(version);
        let updated = stored.clone();
        state.status_writes += 1;
        Ok(updated)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.state().cdqs.remove(&key(namespace, name));
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for InMemoryCluster {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<BinaryData>, ClusterError> {
        Ok(self.config(namespace, name))
    }

    async fn create(&self, template: &ConfigMap) -> Result<(), ClusterError> {
        let k = key(&template.namespace().unwrap_or_default(), &template.name_any());
        self.state()
            .configs
            .entry(k)
            .or_insert_with(|| (template.clone(), BinaryData::new()));
        Ok(())
    }

    async fn write(
        &self,
        namespace: &str,
        name: &str,
        data: BinaryData,
    ) -> Result<(), ClusterError> {
        let mut state = self.state();
        let entry = state.configs.entry(key(namespace, name)).or_insert_with(|| {
            let mut object = ConfigMap::default();
            object.metadata.name = Some(name.to_string());
            object.metadata.namespace = Some(namespace.to_string());
            (object, BinaryData::new())
        });
        entry.1.extend(data);
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.state().configs.remove(&key(namespace, name));
        Ok(())
    }
}

#[async_trait]
impl SecretStore for InMemoryCluster {
    async fn password(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Vec<u8>>, ClusterError> {
        Ok(self
            .state()
            .secrets
            .get(&key(namespace, name))
            .map(|data| data.get(super::kubernetes::PASSWORD_KEY).cloned().unwrap_or_default()))
    }
}

#[async_trait]
impl JobLauncher for InMemoryCluster {
    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, ClusterError> {
        Ok(self.state().jobs.contains_key(&key(namespace, name)))
    }

    async fn launch(&self, job: &Job) -> Result<(), ClusterError> {
        let k = key(&job.namespace().unwrap_or_default(), &job.name_any());
        self.state().jobs.entry(k).or_insert_with(|| job.clone());
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.state().jobs.remove(&key(namespace, name));
        Ok(())
    }
}
