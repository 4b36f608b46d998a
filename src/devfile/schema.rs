//! Minimal devfile model
//!
//! Only the fields detection needs are modelled; everything else in the
//! document is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Devfile {
    /// Required; kept untyped since `2.2` reads as a YAML float
    pub schema_version: serde_yaml::Value,
    #[serde(default)]
    pub metadata: DevfileMetadata,
    #[serde(default)]
    pub components: Vec<DevfileComponent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevfileMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub project_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevfileComponent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub container: Option<ContainerComponent>,
    #[serde(default)]
    pub kubernetes: Option<serde_yaml::Value>,
    #[serde(default)]
    pub openshift: Option<serde_yaml::Value>,
    #[serde(default)]
    pub image: Option<ImageComponent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerComponent {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default)]
    pub name: String,
    pub target_port: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageComponent {
    #[serde(default)]
    pub dockerfile: Option<DockerfileImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerfileImage {
    #[serde(default)]
    pub uri: Option<String>,
}

impl Devfile {
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Whether a Kubernetes or OpenShift deploy component is declared
    pub fn has_outerloop(&self) -> bool {
        self.components
            .iter()
            .any(|c| c.kubernetes.is_some() || c.openshift.is_some())
    }

    /// Dockerfile referenced by the first image component, if any
    pub fn dockerfile_uri(&self) -> Option<&str> {
        self.components
            .iter()
            .filter_map(|c| c.image.as_ref()?.dockerfile.as_ref()?.uri.as_deref())
            .map(str::trim)
            .find(|uri| !uri.is_empty())
    }

    /// Container endpoint ports in declaration order
    pub fn endpoint_ports(&self) -> Vec<u16> {
        self.components
            .iter()
            .filter_map(|c| c.container.as_ref())
            .flat_map(|c| c.endpoints.iter())
            .filter_map(|e| u16::try_from(e.target_port).ok())
            .filter(|port| *port > 0)
            .collect()
    }
}
