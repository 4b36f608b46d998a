//! Controller configuration
//!
//! Defaults, optionally overlaid by a YAML file, then by `CDQ_*`
//! environment variables. CLI flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::metrics::MetricsConfig;
use crate::runner::JobSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Run detection inside the controller instead of worker jobs
    pub run_analysis_locally: bool,

    /// Image of worker jobs; it must contain the `cdq-controller` binary
    pub analysis_image: String,

    pub analysis_service_account: Option<String>,

    /// How often an offloaded analysis is polled
    #[serde(with = "humantime_serde")]
    pub worker_poll_interval: Duration,

    /// Requeue delay after a failed reconcile
    #[serde(with = "humantime_serde")]
    pub error_requeue_interval: Duration,

    #[serde(with = "humantime_serde")]
    pub git_timeout: Duration,

    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,

    /// Devfile registry used for stack matches
    pub registry_url: String,

    /// Attempts for a status write that keeps hitting conflicts
    pub status_update_retries: u32,

    /// Label key marking configuration objects and jobs owned by the controller
    pub side_object_label: String,

    /// How long finished worker jobs are kept
    #[serde(with = "humantime_serde")]
    pub worker_ttl: Duration,

    /// Emit detection request counters
    pub metrics_enabled: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            run_analysis_locally: false,
            analysis_image: "quay.io/redhat-appstudio/cdq-controller:latest".to_string(),
            analysis_service_account: None,
            worker_poll_interval: Duration::from_secs(5),
            error_requeue_interval: Duration::from_secs(10),
            git_timeout: Duration::from_secs(60),
            http_timeout: Duration::from_secs(30),
            registry_url: "https://registry.devfile.io".to_string(),
            status_update_retries: 5,
            side_object_label: "appstudio.redhat.com/cdq-analysis".to_string(),
            worker_ttl: Duration::from_secs(600),
            metrics_enabled: true,
        }
    }
}

impl ControllerConfig {
    /// Defaults overlaid by `path` (when given) and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_env_vars();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge environment variables into config
    pub fn merge_env_vars(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Apply `CDQ_*` overrides read through `lookup`; unparsable values are
    /// logged and ignored
    pub fn merge_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = parse_env(&lookup, "CDQ_RUN_ANALYSIS_LOCALLY", |v| v.parse::<bool>().ok()) {
            self.run_analysis_locally = value;
        }
        if let Some(image) = lookup("CDQ_ANALYSIS_IMAGE") {
            self.analysis_image = image;
        }
        if let Some(account) = lookup("CDQ_ANALYSIS_SERVICE_ACCOUNT") {
            self.analysis_service_account = Some(account).filter(|a| !a.is_empty());
        }
        if let Some(registry) = lookup("CDQ_REGISTRY_URL") {
            self.registry_url = registry;
        }
        if let Some(label) = lookup("CDQ_SIDE_OBJECT_LABEL") {
            self.side_object_label = label;
        }
        if let Some(enabled) = parse_env(&lookup, "CDQ_METRICS_ENABLED", |v| v.parse::<bool>().ok()) {
            self.metrics_enabled = enabled;
        }
        if let Some(retries) = parse_env(&lookup, "CDQ_STATUS_UPDATE_RETRIES", |v| v.parse().ok()) {
            self.status_update_retries = retries;
        }

        let durations: [(&str, &mut Duration); 5] = [
            ("CDQ_WORKER_POLL_INTERVAL", &mut self.worker_poll_interval),
            ("CDQ_ERROR_REQUEUE_INTERVAL", &mut self.error_requeue_interval),
            ("CDQ_GIT_TIMEOUT", &mut self.git_timeout),
            ("CDQ_HTTP_TIMEOUT", &mut self.http_timeout),
            ("CDQ_WORKER_TTL", &mut self.worker_ttl),
        ];
        for (key, slot) in durations {
            if let Some(value) = parse_env(&lookup, key, parse_duration) {
                *slot = value;
            }
        }
    }

    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            enabled: self.metrics_enabled,
        }
    }

    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            image: self.analysis_image.clone(),
            service_account: self.analysis_service_account.clone(),
            ttl: self.worker_ttl,
            label: self.side_object_label.clone(),
        }
    }
}

fn parse_env<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!("Ignoring invalid value {:?} for {}", raw, key);
    }
    parsed
}

fn parse_duration(raw: &str) -> Option<Duration> {
    humantime_serde::re::humantime::parse_duration(raw).ok()
}
