//! Prometheus metrics for the payout services.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec, Encoder,
    HistogramVec, IntCounter, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Proxy requests by route and response status.
pub static PROXY_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payout_proxy_requests_total",
        "Total proxy requests by route and status",
        &["route", "status"]
    )
    .unwrap()
});

/// Upstream round-trip latency in milliseconds.
/// Labels: transport (http/socket)
pub static UPSTREAM_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "payout_upstream_latency_ms",
        "Upstream statement round-trip latency in milliseconds",
        &["transport"],
        vec![25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0]
    )
    .unwrap()
});

/// Session outcomes.
/// Labels: outcome (ok/validation/upstream/transport/internal)
pub static SESSION_OUTCOME_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payout_session_outcome_total",
        "Statement fetch outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Commission records produced by extraction.
pub static COMMISSIONS_EXTRACTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "payout_commissions_extracted_total",
        "Total commission records extracted from statements"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a proxy request.
    pub fn proxy_request(route: &str, status: u16) {
        PROXY_REQUESTS_TOTAL
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Record upstream latency.
    pub fn upstream_latency(transport: &str, latency_ms: f64) {
        UPSTREAM_LATENCY_MS
            .with_label_values(&[transport])
            .observe(latency_ms);
    }

    /// Record a fetch outcome ("ok" or an error kind).
    pub fn session_outcome(outcome: &str) {
        SESSION_OUTCOME_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn commissions_extracted(count: usize) {
        COMMISSIONS_EXTRACTED_TOTAL.inc_by(count as u64);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
