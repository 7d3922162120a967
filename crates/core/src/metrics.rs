//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Separation runs (starts, outcomes, durations)
//! - Separator output consumption and persisted progress

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Separation Run Metrics
// =============================================================================

/// Separation runs started.
pub static RUNS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "karaoke_separation_runs_started_total",
        "Total separation runs started",
    )
    .unwrap()
});

/// Separation runs finished by result.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "karaoke_separation_runs_total",
            "Total separation runs finished",
        ),
        &["result"], // "ready", "failed"
    )
    .unwrap()
});

/// Separation run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "karaoke_separation_duration_seconds",
            "Duration of separation runs",
        )
        .buckets(vec![
            1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
        ]),
        &["result"],
    )
    .unwrap()
});

/// Failed runs by failure kind.
pub static RUN_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "karaoke_separation_failures_total",
            "Total separation run failures by kind",
        ),
        &["kind"], // "spawn", "exit_code", "missing_artifacts", "ambiguous_artifacts", "io", "store"
    )
    .unwrap()
});

// =============================================================================
// Separator Output Metrics
// =============================================================================

/// Output lines read from the separator.
pub static OUTPUT_LINES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "karaoke_separator_output_lines_total",
        "Total output lines read from the separator",
    )
    .unwrap()
});

/// Progress values written to the store.
pub static PROGRESS_UPDATES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "karaoke_progress_updates_total",
        "Total progress updates persisted",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Runs
        Box::new(RUNS_STARTED.clone()),
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(RUN_FAILURES.clone()),
        // Output
        Box::new(OUTPUT_LINES.clone()),
        Box::new(PROGRESS_UPDATES.clone()),
    ]
}
