//! Prometheus metrics for the FinIntel gateway.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which is a startup configuration error.
//! These panics only occur during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, Encoder, HistogramVec, IntCounter, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Validation failures.
/// Labels: kind (format/injection)
pub static VALIDATION_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finintel_validation_failures_total",
        "Total rejected ticker inputs",
        &["kind"]
    )
    .unwrap()
});

/// Compliance verdicts.
/// Labels: status (APPROVED/DENIED), level
pub static COMPLIANCE_DECISIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finintel_compliance_decisions_total",
        "Total compliance verdicts by status and level",
        &["status", "level"]
    )
    .unwrap()
});

/// Human-in-the-loop outcomes.
/// Labels: outcome (pending/approved/denied)
pub static HITL_OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finintel_hitl_outcomes_total",
        "Total HITL approval outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Currently pending HITL approvals.
pub static HITL_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("finintel_hitl_pending", "Pending HITL approvals").unwrap()
});

/// Cache lookups.
/// Labels: result (hit/miss)
pub static CACHE_LOOKUPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finintel_cache_lookups_total",
        "Total cache lookups by result",
        &["result"]
    )
    .unwrap()
});

pub static CACHE_WRITES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("finintel_cache_writes_total", "Total cache writes").unwrap()
});

/// Rate-limit rejections.
/// Labels: tool
pub static RATE_LIMIT_REJECTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finintel_rate_limit_rejections_total",
        "Total requests rejected by the rate limiter",
        &["tool"]
    )
    .unwrap()
});

/// Silent failures detected in upstream responses.
/// Labels: code (API_THROTTLE/INVALID_TICKER/...)
pub static SILENT_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finintel_silent_failures_total",
        "Total upstream responses rejected by failure detection",
        &["code"]
    )
    .unwrap()
});

/// Upstream call latency in milliseconds.
/// Labels: operation (info/ownership)
pub static PROVIDER_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finintel_provider_latency_ms",
        "Upstream provider call latency in milliseconds",
        &["operation"],
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Blocking provider calls currently running on the worker pool.
pub static WORKER_POOL_INFLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "finintel_worker_pool_inflight",
        "Provider calls currently running on the worker pool"
    )
    .unwrap()
});

/// Terminal pipeline outcomes.
/// Labels: outcome (success/error code/suspended)
pub static PIPELINE_OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finintel_pipeline_outcomes_total",
        "Total pipeline runs by terminal outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Rows reclaimed by maintenance sweeps.
/// Labels: table
pub static MAINTENANCE_RECLAIMED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finintel_maintenance_reclaimed_total",
        "Total rows reclaimed by maintenance sweeps",
        &["table"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn validation_failed(kind: &str) {
        VALIDATION_FAILURES_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn compliance_decision(status: &str, level: &str) {
        COMPLIANCE_DECISIONS_TOTAL
            .with_label_values(&[status, level])
            .inc();
    }

    pub fn hitl_outcome(outcome: &str) {
        HITL_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn hitl_pending_set(count: i64) {
        HITL_PENDING.set(count);
    }

    pub fn cache_hit() {
        CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
    }

    pub fn cache_miss() {
        CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();
    }

    pub fn cache_write() {
        CACHE_WRITES_TOTAL.inc();
    }

    pub fn rate_limited(tool: &str) {
        RATE_LIMIT_REJECTIONS_TOTAL.with_label_values(&[tool]).inc();
    }

    pub fn silent_failure(code: &str) {
        SILENT_FAILURES_TOTAL.with_label_values(&[code]).inc();
    }

    pub fn provider_latency(operation: &str, latency_ms: f64) {
        PROVIDER_LATENCY_MS
            .with_label_values(&[operation])
            .observe(latency_ms);
    }

    pub fn worker_started() {
        WORKER_POOL_INFLIGHT.inc();
    }

    pub fn worker_finished() {
        WORKER_POOL_INFLIGHT.dec();
    }

    pub fn pipeline_outcome(outcome: &str) {
        PIPELINE_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn maintenance_reclaimed(table: &str, rows: usize) {
        MAINTENANCE_RECLAIMED_TOTAL
            .with_label_values(&[table])
            .inc_by(rows as f64);
    }

    /// Render the default registry in Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_touched_metrics() {
        Metrics::cache_hit();
        Metrics::silent_failure("API_THROTTLE");
        Metrics::maintenance_reclaimed("ticker_cache", 3);

        let text = Metrics::render().unwrap();
        assert!(text.contains("finintel_cache_lookups_total"));
        assert!(text.contains("finintel_silent_failures_total"));
        assert!(text.contains("finintel_maintenance_reclaimed_total"));
    }
}
