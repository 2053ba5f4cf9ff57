//! Metrics collection using Prometheus
//!
//! Counters for room operations and report publishing, plus a gauge for
//! the current waiting-list size.

use anyhow::Result;
use prometheus::{IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Main metrics collector for the waiting-list service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Total join transitions applied
    pub joins_total: IntCounter,

    /// Total call transitions applied
    pub calls_total: IntCounter,

    /// Total leave transitions applied
    pub leaves_total: IntCounter,

    /// Total sweep passes executed
    pub sweeps_total: IntCounter,

    /// Total membership reconciliations (session ready/resumed)
    pub syncs_total: IntCounter,

    /// Total waiting-list shuffles
    pub resets_total: IntCounter,

    /// Total gateway events that failed to process
    pub event_errors_total: IntCounter,

    /// Members currently tracked on the waiting list
    pub members_tracked: IntGauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with a custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let joins_total = IntCounter::with_opts(Opts::new(
            "greenroom_joins_total",
            "Total join transitions applied to the waiting room",
        ))?;
        let calls_total = IntCounter::with_opts(Opts::new(
            "greenroom_calls_total",
            "Total call transitions applied to the waiting room",
        ))?;
        let leaves_total = IntCounter::with_opts(Opts::new(
            "greenroom_leaves_total",
            "Total leave transitions applied to the waiting room",
        ))?;
        let sweeps_total = IntCounter::with_opts(Opts::new(
            "greenroom_sweeps_total",
            "Total stale-member sweep passes",
        ))?;
        let syncs_total = IntCounter::with_opts(Opts::new(
            "greenroom_syncs_total",
            "Total membership snapshot reconciliations",
        ))?;
        let resets_total = IntCounter::with_opts(Opts::new(
            "greenroom_resets_total",
            "Total waiting-list shuffles",
        ))?;
        let event_errors_total = IntCounter::with_opts(Opts::new(
            "greenroom_event_errors_total",
            "Total gateway events that failed to process",
        ))?;
        let members_tracked = IntGauge::with_opts(Opts::new(
            "greenroom_members_tracked",
            "Members currently tracked on the waiting list",
        ))?;

        registry.register(Box::new(joins_total.clone()))?;
        registry.register(Box::new(calls_total.clone()))?;
        registry.register(Box::new(leaves_total.clone()))?;
        registry.register(Box::new(sweeps_total.clone()))?;
        registry.register(Box::new(syncs_total.clone()))?;
        registry.register(Box::new(resets_total.clone()))?;
        registry.register(Box::new(event_errors_total.clone()))?;
        registry.register(Box::new(members_tracked.clone()))?;

        Ok(Self {
            registry,
            joins_total,
            calls_total,
            leaves_total,
            sweeps_total,
            syncs_total,
            resets_total,
            event_errors_total,
            members_tracked,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_creation() {
        let collector = MetricsCollector::new().unwrap();
        assert_eq!(collector.joins_total.get(), 0);
        assert_eq!(collector.members_tracked.get(), 0);
    }

    #[test]
    fn test_counters_increment() {
        let collector = MetricsCollector::new().unwrap();
        collector.joins_total.inc();
        collector.members_tracked.set(3);

        assert_eq!(collector.joins_total.get(), 1);
        assert_eq!(collector.members_tracked.get(), 3);
    }

    #[test]
    fn test_metrics_are_registered() {
        let collector = MetricsCollector::new().unwrap();
        collector.sweeps_total.inc();

        let families = collector.registry().gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "greenroom_sweeps_total"));
    }
}
