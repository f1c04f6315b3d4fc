//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters/gauges the scheduler, rule engine, and cross-seed
//!   matcher need for basic operational visibility.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    rule_evaluations_total: IntCounterVec,
    actions_executed_total: IntCounterVec,
    runs_started_total: IntCounterVec,
    runs_failed_total: IntCounterVec,
    active_workers: IntGauge,
    limiter_waits_total: IntCounter,
    crossseed_matches_total: IntCounterVec,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Number of currently active scheduler workers.
    pub active_workers: i64,
    /// Total limiter waits observed since process start.
    pub limiter_waits_total: u64,
}

fn register(registry: &Registry, metric: &'static str, err: prometheus::Error) -> TelemetryError {
    let _ = registry;
    TelemetryError::MetricRegistrationFailed {
        metric,
        source: err,
    }
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let rule_evaluations_total = IntCounterVec::new(
            Opts::new(
                "rule_evaluations_total",
                "Rule condition evaluations by outcome",
            ),
            &["instance_id", "matched"],
        )
        .map_err(|e| register(&registry, "rule_evaluations_total", e))?;

        let actions_executed_total = IntCounterVec::new(
            Opts::new("actions_executed_total", "Actions executed by kind/outcome"),
            &["action", "outcome"],
        )
        .map_err(|e| register(&registry, "actions_executed_total", e))?;

        let runs_started_total = IntCounterVec::new(
            Opts::new("runs_started_total", "Scheduled runs started by kind"),
            &["kind"],
        )
        .map_err(|e| register(&registry, "runs_started_total", e))?;

        let runs_failed_total = IntCounterVec::new(
            Opts::new("runs_failed_total", "Scheduled runs that ended failed"),
            &["kind"],
        )
        .map_err(|e| register(&registry, "runs_failed_total", e))?;

        let active_workers = IntGauge::with_opts(Opts::new(
            "active_workers",
            "Number of active (instance, job) scheduler workers",
        ))
        .map_err(|e| register(&registry, "active_workers", e))?;

        let limiter_waits_total = IntCounter::with_opts(Opts::new(
            "limiter_waits_total",
            "Total waits on per-host rate limiters",
        ))
        .map_err(|e| register(&registry, "limiter_waits_total", e))?;

        let crossseed_matches_total = IntCounterVec::new(
            Opts::new("crossseed_matches_total", "Cross-seed matches by reason"),
            &["reason"],
        )
        .map_err(|e| register(&registry, "crossseed_matches_total", e))?;

        for collector in [
            Box::new(rule_evaluations_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(actions_executed_total.clone()),
            Box::new(runs_started_total.clone()),
            Box::new(runs_failed_total.clone()),
            Box::new(active_workers.clone()),
            Box::new(limiter_waits_total.clone()),
            Box::new(crossseed_matches_total.clone()),
        ] {
            registry
                .register(collector)
                .map_err(|e| register(&registry, "collector", e))?;
        }

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                rule_evaluations_total,
                actions_executed_total,
                runs_started_total,
                runs_failed_total,
                active_workers,
                limiter_waits_total,
                crossseed_matches_total,
            }),
        })
    }

    /// Record a rule evaluation outcome for an instance.
    pub fn record_rule_evaluation(&self, instance_id: i64, matched: bool) {
        self.inner
            .rule_evaluations_total
            .with_label_values(&[&instance_id.to_string(), if matched { "true" } else { "false" }])
            .inc();
    }

    /// Record an action execution outcome.
    pub fn record_action(&self, action: &str, outcome: &str) {
        self.inner
            .actions_executed_total
            .with_label_values(&[action, outcome])
            .inc();
    }

    /// Record that a run of the given kind started.
    pub fn record_run_started(&self, kind: &str) {
        self.inner.runs_started_total.with_label_values(&[kind]).inc();
    }

    /// Record that a run of the given kind failed.
    pub fn record_run_failed(&self, kind: &str) {
        self.inner.runs_failed_total.with_label_values(&[kind]).inc();
    }

    /// Set the current active worker count.
    pub fn set_active_workers(&self, count: i64) {
        self.inner.active_workers.set(count);
    }

    /// Record a limiter wait.
    pub fn record_limiter_wait(&self) {
        self.inner.limiter_waits_total.inc();
    }

    /// Record a cross-seed match by reason (`hash` or `filelist`).
    pub fn record_crossseed_match(&self, reason: &str) {
        self.inner
            .crossseed_matches_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Render the registry in Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if metric families cannot be encoded.
    pub fn render(&self) -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer).map_err(|e| {
            TelemetryError::MetricRegistrationFailed {
                metric: "render",
                source: e,
            }
        })?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Capture a snapshot of the gauges most useful for health reporting.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_workers: self.inner.active_workers.get(),
            limiter_waits_total: self.inner.limiter_waits_total.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_record_and_render() {
        let metrics = Metrics::new().expect("metrics registry");
        metrics.record_rule_evaluation(1, true);
        metrics.record_action("tag", "success");
        metrics.record_run_started("hourly");
        metrics.set_active_workers(3);
        metrics.record_limiter_wait();
        metrics.record_crossseed_match("hash");

        let rendered = metrics.render().expect("render metrics");
        assert!(rendered.contains("rule_evaluations_total"));
        assert!(rendered.contains("crossseed_matches_total"));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_workers, 3);
        assert_eq!(snapshot.limiter_waits_total, 1);
    }
}
