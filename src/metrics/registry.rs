//! Fan-out of detection request events to collectors

use super::events::{MetricEvent, MetricsCollector};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Metrics settings taken from the controller configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Drop every event when false
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Registry fanning events out to every registered collector
pub struct MetricsRegistry {
    collectors: Arc<RwLock<Vec<Arc<dyn MetricsCollector>>>>,
    config: MetricsConfig,
}

impl MetricsRegistry {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            collectors: Arc::new(RwLock::new(Vec::new())),
            config,
        }
    }

    pub async fn register_collector(&self, collector: Arc<dyn MetricsCollector>) {
        self.collectors.write().await.push(collector);
    }

    /// Hand `event` to every collector.
    ///
    /// A failing collector is logged and skipped; reconciliation never sees it.
    pub async fn record(&self, event: MetricEvent) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let collectors = self.collectors.read().await;
        let mut errors = Vec::new();
        for collector in collectors.iter() {
            if let Err(e) = collector.record(event.clone()).await {
                errors.push(format!("Collector '{}': {}", collector.name(), e));
            }
        }

        if !errors.is_empty() {
            tracing::warn!(
                counter = %event.counter,
                "Metrics recording errors: {}",
                errors.join(", ")
            );
        }
        Ok(())
    }

    pub async fn flush(&self) -> Result<()> {
        let collectors = self.collectors.read().await;
        let mut errors = Vec::new();

        for collector in collectors.iter() {
            if let Err(e) = collector.flush().await {
                errors.push(format!("Collector '{}': {}", collector.name(), e));
            }
        }

        if !errors.is_empty() {
            return Err(anyhow::anyhow!("Flush errors: {}", errors.join(", ")));
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}
