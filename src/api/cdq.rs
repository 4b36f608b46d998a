//! ComponentDetectionQuery resource

use std::collections::BTreeMap;

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::conditions::{CdqCondition, PROCESSING, COMPLETED};

/// Annotation forcing in-process analysis when set to `"true"`
pub const RUN_LOCAL_ANNOTATION: &str = "runCDQAnalysisLocal";

/// Context used when the spec leaves it empty
pub const ROOT_CONTEXT: &str = "./";

/// Request to inspect a source repository and propose components
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "appstudio.redhat.com",
    version = "v1alpha1",
    kind = "ComponentDetectionQuery",
    plural = "componentdetectionqueries",
    shortname = "hcdq",
    status = "ComponentDetectionQueryStatus",
    namespaced,
    printcolumn = r#"{"name":"URL","type":"string","jsonPath":".spec.url"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetectionQuerySpec {
    /// Git repository URL; only GitHub is supported
    pub url: String,

    /// Branch or tag; defaults to the repository's default branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Sub-path to start detection from; defaults to the repository root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Explicit devfile to use instead of detection
    #[serde(default, rename = "devfileURL", skip_serializing_if = "Option::is_none")]
    pub devfile_url: Option<String>,

    /// Name of a Secret whose `password` key holds a Git token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Informational hint; detection decides on its own
    #[serde(default)]
    pub is_multi_component: bool,
}

/// Observed state of a ComponentDetectionQuery
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetectionQueryStatus {
    /// Processing first, then at most one terminal condition
    #[serde(default)]
    pub conditions: Vec<CdqCondition>,

    /// Detected components keyed by component name
    #[serde(default)]
    pub component_detected: BTreeMap<String, ComponentDescriptor>,
}

/// A component proposed by detection
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub component_name: String,
    pub source: ComponentSource,
    /// True only when a devfile exists in the repository itself
    pub devfile_found: bool,
    /// Primary container port, zero when unknown
    pub target_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSource {
    pub git_source: GitSource,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct GitSource {
    pub url: String,
    pub revision: String,
    pub context: String,
    #[serde(default, rename = "devfileURL", skip_serializing_if = "Option::is_none")]
    pub devfile_url: Option<String>,
    #[serde(default, rename = "dockerfileURL", skip_serializing_if = "Option::is_none")]
    pub dockerfile_url: Option<String>,
}

impl ComponentDetectionQuerySpec {
    /// The starting context with `./` standing in for an empty value
    pub fn normalized_context(&self) -> String {
        normalize_context(self.context.as_deref())
    }

    pub fn revision(&self) -> Option<&str> {
        non_empty(self.revision.as_deref())
    }

    pub fn devfile_url(&self) -> Option<&str> {
        non_empty(self.devfile_url.as_deref())
    }

    pub fn secret(&self) -> Option<&str> {
        non_empty(self.secret.as_deref())
    }
}

impl ComponentDetectionQuery {
    /// `Some(true)`/`Some(false)` when the run-local annotation is present
    pub fn run_local_annotation(&self) -> Option<bool> {
        self.annotations()
            .get(RUN_LOCAL_ANNOTATION)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    pub fn conditions(&self) -> &[CdqCondition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    pub fn processing_condition(&self) -> Option<&CdqCondition> {
        self.conditions().iter().find(|c| c.type_ == PROCESSING)
    }

    pub fn terminal_condition(&self) -> Option<&CdqCondition> {
        self.conditions().iter().find(|c| c.type_ == COMPLETED)
    }

    /// Whether the spec changed after the terminal condition was recorded
    pub fn spec_changed_since_terminal(&self) -> bool {
        match (self.terminal_condition(), self.metadata.generation) {
            (Some(terminal), Some(generation)) => {
                terminal.observed_generation.unwrap_or_default() < generation
            }
            _ => false,
        }
    }

    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}

/// Normalise a context to the repo-relative form used as a map key
pub fn normalize_context(context: Option<&str>) -> String {
    let trimmed = context
        .unwrap_or_default()
        .trim()
        .trim_start_matches("./")
        .trim_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        ROOT_CONTEXT.to_string()
    } else {
        trimmed.to_string()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
