//! Collectors for detection request events

use super::events::{MetricEvent, MetricsCollector};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory collector keeping counter totals and recent events, used by tests
pub struct MemoryMetricsCollector {
    name: String,
    events: Arc<RwLock<Vec<MetricEvent>>>,
    totals: Arc<RwLock<BTreeMap<String, u64>>>,
    max_events: usize,
}

impl MemoryMetricsCollector {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, 10_000)
    }

    /// Keep at most `max_events` recent events; totals are never dropped
    pub fn with_capacity(name: impl Into<String>, max_events: usize) -> Self {
        Self {
            name: name.into(),
            events: Arc::new(RwLock::new(Vec::new())),
            totals: Arc::new(RwLock::new(BTreeMap::new())),
            max_events,
        }
    }

    pub async fn events(&self) -> Vec<MetricEvent> {
        self.events.read().await.clone()
    }

    /// Current total of a counter, zero if never incremented
    pub async fn counter(&self, name: &str) -> u64 {
        self.totals.read().await.get(name).copied().unwrap_or(0)
    }

    /// Snapshot of every counter total
    pub async fn snapshot(&self) -> BTreeMap<String, u64> {
        self.totals.read().await.clone()
    }
}

#[async_trait]
impl MetricsCollector for MemoryMetricsCollector {
    async fn record(&self, event: MetricEvent) -> Result<()> {
        *self.totals.write().await.entry(event.counter.clone()).or_insert(0) += 1;

        let mut events = self.events.write().await;
        if events.len() >= self.max_events {
            // Remove oldest events (FIFO)
            let remove_count = events.len() + 1 - self.max_events;
            let len = events.len();
            events.drain(0..remove_count.min(len));
        }
        events.push(event);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Collector emitting each event as a structured `tracing` record
pub struct TracingMetricsCollector {
    name: String,
}

impl TracingMetricsCollector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl MetricsCollector for TracingMetricsCollector {
    async fn record(&self, event: MetricEvent) -> Result<()> {
        tracing::info!(
            target: "cdq_controller::metrics",
            metric = %event.counter,
            namespace = %event.namespace,
            reason = event.reason.as_deref().unwrap_or("-"),
            "detection request counted"
        );
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
