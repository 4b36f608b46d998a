//! Worker job and configuration object manifests

use std::collections::BTreeMap;
use std::time::Duration;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{ConfigMap, Container, PodSpec, PodTemplateSpec};
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::api::ComponentDetectionQuery;

/// Where and how worker jobs run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    pub image: String,
    pub service_account: Option<String>,
    /// Time a finished job is kept before the cluster removes it
    pub ttl: Duration,
    /// Label key set on every side object; its value is the CDQ name
    pub label: String,
}

/// Name of the worker job for a CDQ
pub fn job_name(cdq_name: &str) -> String {
    format!("{cdq_name}-job")
}

fn side_object_meta(cdq: &ComponentDetectionQuery, name: String, label: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: cdq.namespace(),
        labels: Some(BTreeMap::from([(label.to_string(), cdq.name_any())])),
        owner_references: cdq.controller_owner_ref(&()).map(|owner| vec![owner]),
        ..Default::default()
    }
}

/// Empty configuration object the worker writes its result into
pub fn config_template(cdq: &ComponentDetectionQuery, label: &str) -> ConfigMap {
    ConfigMap {
        metadata: side_object_meta(cdq, cdq.name_any(), label),
        ..Default::default()
    }
}

/// One-shot job running `cdq-controller analyze` for a CDQ
pub fn worker_job(cdq: &ComponentDetectionQuery, settings: &JobSettings) -> Job {
    let name = cdq.name_any();
    let namespace = cdq.namespace().unwrap_or_default();
    let metadata = side_object_meta(cdq, job_name(&name), &settings.label);

    let container = Container {
        name: "analyze".to_string(),
        image: Some(settings.image.clone()),
        command: Some(vec!["cdq-controller".to_string()]),
        args: Some(vec![
            "analyze".to_string(),
            "--namespace".to_string(),
            namespace,
            "--name".to_string(),
            name,
        ]),
        ..Default::default()
    };

    Job {
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            ttl_seconds_after_finished: Some(
                i32::try_from(settings.ttl.as_secs()).unwrap_or(i32::MAX),
            ),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: metadata.labels.clone(),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    service_account_name: settings.service_account.clone(),
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        metadata,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ComponentDetectionQuerySpec;

    fn cdq() -> ComponentDetectionQuery {
        let mut cdq = ComponentDetectionQuery::new("sample", ComponentDetectionQuerySpec::default());
        cdq.metadata.namespace = Some("team".into());
        cdq.metadata.uid = Some("1234".into());
        cdq
    }

    fn settings() -> JobSettings {
        JobSettings {
            image: "quay.io/example/cdq-controller:latest".into(),
            service_account: Some("cdq-worker".into()),
            ttl: Duration::from_secs(300),
            label: "appstudio.redhat.com/cdq".into(),
        }
    }

    #[test]
    fn test_worker_job_manifest() {
        let job = worker_job(&cdq(), &settings());
        assert_eq!(job.metadata.name.as_deref(), Some("sample-job"));
        assert_eq!(job.metadata.namespace.as_deref(), Some("team"));

        let owners = job.metadata.owner_references.unwrap();
        assert_eq!(owners[0].uid, "1234");
        assert_eq!(owners[0].controller, Some(true));

        let spec = job.spec.unwrap();
        assert_eq!(spec.backoff_limit, Some(0));
        assert_eq!(spec.ttl_seconds_after_finished, Some(300));
        let pod = spec.template.spec.unwrap();
        assert_eq!(pod.restart_policy.as_deref(), Some("Never"));
        assert_eq!(pod.service_account_name.as_deref(), Some("cdq-worker"));
        assert_eq!(
            pod.containers[0].args.clone().unwrap(),
            vec!["analyze", "--namespace", "team", "--name", "sample"]
        );
    }

    #[test]
    fn test_config_template_is_labelled_and_empty() {
        let config = config_template(&cdq(), "appstudio.redhat.com/cdq");
        assert_eq!(config.metadata.name.as_deref(), Some("sample"));
        assert_eq!(
            config.metadata.labels.unwrap().get("appstudio.redhat.com/cdq").map(String::as_str),
            Some("sample")
        );
        assert!(config.binary_data.is_none());
    }
}
