//! Detection request events and the collector trait

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorTag;

/// One increment of a detection request counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    /// Counter being bumped, e.g. `ImportGitRepoTotalReqs`
    pub counter: String,
    /// Namespace of the ComponentDetectionQuery
    pub namespace: String,
    /// Error tag of a failed request
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl MetricEvent {
    pub fn request(counter: &str, namespace: &str, reason: Option<ErrorTag>) -> Self {
        Self {
            counter: counter.to_string(),
            namespace: namespace.to_string(),
            reason: reason.map(|tag| tag.as_str().to_string()),
            timestamp: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.counter
    }
}

/// Sink for detection request events
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    async fn record(&self, event: MetricEvent) -> Result<()>;

    /// Flush buffered events
    async fn flush(&self) -> Result<()>;

    /// Collector name, used in error reports
    fn name(&self) -> &str;
}
