//! Detection request counters
//!
//! The reconciler bumps three monotonic counters at terminal transitions.
//! Events fan out through a [`MetricsRegistry`] to the registered
//! collectors; failures to record never affect reconciliation.

pub mod backends;
pub mod events;
pub mod registry;

use std::sync::Arc;

pub use backends::{MemoryMetricsCollector, TracingMetricsCollector};
pub use events::{MetricEvent, MetricsCollector};
pub use registry::{MetricsConfig, MetricsRegistry};

use crate::api::TerminalOutcome;

pub const TOTAL_REQUESTS: &str = "ImportGitRepoTotalReqs";
pub const SUCCEEDED_REQUESTS: &str = "ImportGitRepoSucceeded";
pub const FAILED_REQUESTS: &str = "ImportGitRepoFailed";

/// Counters for terminal detection outcomes
#[derive(Clone)]
pub struct DetectionMetrics {
    registry: Arc<MetricsRegistry>,
}

impl DetectionMetrics {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }

    /// Registry with a tracing collector, as used by the controller binary
    pub async fn with_tracing(config: MetricsConfig) -> Self {
        let registry = MetricsRegistry::new(config);
        if !registry.is_enabled() {
            tracing::info!("Detection metrics are disabled");
        }
        registry
            .register_collector(Arc::new(TracingMetricsCollector::new("tracing")))
            .await;
        Self::new(Arc::new(registry))
    }

    pub async fn flush(&self) {
        if let Err(e) = self.registry.flush().await {
            tracing::warn!("Failed to flush metrics: {}", e);
        }
    }

    /// Count a terminal outcome: the total plus exactly one of succeeded or failed
    pub async fn record_outcome(&self, namespace: &str, outcome: &TerminalOutcome) {
        let (result_counter, reason) = match outcome {
            TerminalOutcome::Succeeded { .. } => (SUCCEEDED_REQUESTS, None),
            TerminalOutcome::Failed { tag, .. } => (FAILED_REQUESTS, Some(*tag)),
        };

        for name in [TOTAL_REQUESTS, result_counter] {
            let event = MetricEvent::request(name, namespace, reason);
            if let Err(e) = self.registry.record(event).await {
                tracing::warn!("Failed to record {}: {}", name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorTag;

    #[tokio::test]
    async fn test_outcome_counters() {
        let registry = Arc::new(MetricsRegistry::default());
        let collector = Arc::new(MemoryMetricsCollector::new("memory"));
        registry.register_collector(collector.clone()).await;
        let metrics = DetectionMetrics::new(registry);

        metrics
            .record_outcome("default", &TerminalOutcome::Succeeded { components: 0 })
            .await;
        metrics
            .record_outcome(
                "default",
                &TerminalOutcome::Failed {
                    tag: ErrorTag::InvalidUrl,
                    message: "bad".into(),
                },
            )
            .await;

        assert_eq!(collector.counter(TOTAL_REQUESTS).await, 2);
        assert_eq!(collector.counter(SUCCEEDED_REQUESTS).await, 1);
        assert_eq!(collector.counter(FAILED_REQUESTS).await, 1);
    }
}
