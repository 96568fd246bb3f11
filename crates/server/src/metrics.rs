//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the swarmprobe server:
//! - HTTP request metrics (latency, counts)
//! - Probe session state (collected dynamically)
//! - Core discovery metrics, registered from `swarmprobe_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "swarmprobe_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("swarmprobe_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "swarmprobe_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Probe Session Metrics (collected dynamically)
// =============================================================================

/// Session running state (1 = running, 0 = idle).
pub static PROBE_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "swarmprobe_session_running",
        "Whether a probe session is running (1) or idle (0)",
    )
    .unwrap()
});

/// Infohashes processed in the current session.
pub static PROBE_HASHES_PROCESSED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "swarmprobe_session_hashes_processed",
        "Infohashes processed since the session last (re)started",
    )
    .unwrap()
});

/// Current processing rate.
pub static PROBE_HASHES_PER_SECOND: Lazy<Gauge> = Lazy::new(|| {
    Gauge::new(
        "swarmprobe_session_hashes_per_second",
        "Infohashes processed per second in the current session",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Session
    registry.register(Box::new(PROBE_RUNNING.clone())).unwrap();
    registry
        .register(Box::new(PROBE_HASHES_PROCESSED.clone()))
        .unwrap();
    registry
        .register(Box::new(PROBE_HASHES_PER_SECOND.clone()))
        .unwrap();

    // Core metrics (sessions, lookups, trackers, enrichment, metadata)
    for metric in swarmprobe_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Update session gauges from the controller before encoding.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.controller().status();
    PROBE_RUNNING.set(if status.running { 1 } else { 0 });
    PROBE_HASHES_PROCESSED.set(status.hashes_processed as i64);
    PROBE_HASHES_PER_SECOND.set(status.hashes_per_second);
}

static HASH_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9a-fA-F]{40}").unwrap());
static PEER_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/peers/[^/]+").unwrap());

/// Normalize a path for metric labels (replace hashes and addresses with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = HASH_SEGMENT.replace_all(path, "{hash}");
    let result = PEER_SEGMENT.replace_all(&result, "/peers/{ip}");
    result.to_string()
}
