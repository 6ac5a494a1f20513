//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Resolution (detail page lookups)
//! - Swarm membership (joins, active memberships)
//! - Relay (bytes delivered, outcomes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Resolution Metrics
// =============================================================================

/// Resolutions total by result.
pub static RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("espada_resolutions_total", "Total identifier resolutions"),
        &["result"], // "resolved", "malformed_identifier", "remote_not_found", ...
    )
    .unwrap()
});

// =============================================================================
// Swarm Metrics
// =============================================================================

/// Swarm joins total by result.
pub static SWARM_JOINS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("espada_swarm_joins_total", "Total swarm join attempts"),
        &["result"], // "joined", "timeout", "failed"
    )
    .unwrap()
});

/// Time spent waiting for swarm metadata.
pub static SWARM_JOIN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "espada_swarm_join_duration_seconds",
            "Duration of swarm joins",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        &["result"],
    )
    .unwrap()
});

/// Memberships currently open.
pub static ACTIVE_MEMBERSHIPS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "espada_active_memberships",
        "Number of swarm memberships currently open",
    )
    .unwrap()
});

// =============================================================================
// Relay Metrics
// =============================================================================

/// Bytes delivered to HTTP clients.
pub static BYTES_RELAYED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "espada_bytes_relayed_total",
        "Total bytes relayed to clients",
    )
    .unwrap()
});

/// Relays finished total by outcome.
pub static RELAYS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("espada_relays_finished_total", "Total relays finished"),
        &["outcome"], // "completed", "disconnected", "failed"
    )
    .unwrap()
});

/// All core metrics, for registration in the server registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(RESOLUTIONS.clone()),
        Box::new(SWARM_JOINS.clone()),
        Box::new(SWARM_JOIN_DURATION.clone()),
        Box::new(ACTIVE_MEMBERSHIPS.clone()),
        Box::new(BYTES_RELAYED.clone()),
        Box::new(RELAYS_FINISHED.clone()),
    ]
}
