//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Probe sessions (starts, pass durations)
//! - Routing-table lookups
//! - Tracker rounds and announce responses
//! - Enrichment and metadata fetches

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Sessions
// =============================================================================

/// Probe sessions started (including self-restarts).
pub static SESSIONS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "swarmprobe_sessions_started_total",
        "Total probe sessions started, including automatic restarts",
    )
    .unwrap()
});

/// Full pass duration in seconds.
pub static PASS_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "swarmprobe_pass_duration_seconds",
            "Duration of one discovery pipeline pass",
        )
        .buckets(vec![
            1.0, 10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0,
        ]),
        &["pipeline"], // "dht_crawl", "query_trackers"
    )
    .unwrap()
});

// =============================================================================
// Discovery
// =============================================================================

/// Routing-table lookups by result.
pub static LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("swarmprobe_lookups_total", "Routing-table lookups"),
        &["result"], // "completed", "timed_out", "failed", "skipped"
    )
    .unwrap()
});

/// Peers persisted by pipeline. Duplicates are not counted.
pub static PEERS_PERSISTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "swarmprobe_peers_persisted_total",
            "New peer rows written",
        ),
        &["pipeline"],
    )
    .unwrap()
});

/// Tracker rounds by result.
pub static TRACKER_ROUNDS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("swarmprobe_tracker_rounds_total", "Tracker announce rounds"),
        &["result"], // "responded", "silent", "failed"
    )
    .unwrap()
});

/// Individual tracker announce outcomes.
pub static TRACKER_ANNOUNCES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "swarmprobe_tracker_announces_total",
            "Announce requests sent to individual trackers",
        ),
        &["protocol", "result"], // protocol: "udp", "http"; result: "ok", "error"
    )
    .unwrap()
});

// =============================================================================
// Enrichment and metadata
// =============================================================================

/// Enrichment lookups that found nothing, by table.
pub static ENRICHMENT_MISSES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "swarmprobe_enrichment_misses_total",
            "GeoIP lookups that returned no record",
        ),
        &["table"], // "city", "asn"
    )
    .unwrap()
});

/// Metadata fetches by result.
pub static METADATA_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "swarmprobe_metadata_fetches_total",
            "Torrent metadata fetch attempts",
        ),
        &["result"], // "ok", "timed_out", "failed"
    )
    .unwrap()
});

/// All core metrics, for registration in the server registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sessions
        Box::new(SESSIONS_STARTED.clone()),
        Box::new(PASS_DURATION.clone()),
        // Discovery
        Box::new(LOOKUPS_TOTAL.clone()),
        Box::new(PEERS_PERSISTED.clone()),
        Box::new(TRACKER_ROUNDS.clone()),
        Box::new(TRACKER_ANNOUNCES.clone()),
        // Enrichment and metadata
        Box::new(ENRICHMENT_MISSES.clone()),
        Box::new(METADATA_FETCHES.clone()),
    ]
}
