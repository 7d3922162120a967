//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the karaoke server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Upload counts
//! - Song counts by status and active separation runs (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

use karaoke_core::SongStatus;

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
            "karaoke_http_request_duration_seconds",
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
        Opts::new("karaoke_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "karaoke_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Song Metrics
// =============================================================================

/// Songs uploaded total.
pub static SONGS_UPLOADED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "karaoke_songs_uploaded_total",
        "Total songs uploaded since startup",
    )
    .unwrap()
});

/// Songs by current status (collected dynamically).
pub static SONGS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("karaoke_songs_by_status", "Current song count by status"),
        &["status"],
    )
    .unwrap()
});

/// Separation runs in flight (collected dynamically).
pub static RUNS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "karaoke_separation_runs_active",
        "Number of separation runs currently in flight",
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

    // Songs
    registry
        .register(Box::new(SONGS_UPLOADED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(SONGS_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(RUNS_ACTIVE.clone())).unwrap();

    // Core metrics (separation runs, separator output)
    for metric in karaoke_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values
/// from the controller and the song store.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.controller().status().await;
    RUNS_ACTIVE.set(status.active_runs.len() as i64);

    for song_status in SongStatus::ALL {
        if let Ok(count) = state.store().count_by_status(song_status) {
            SONGS_BY_STATUS
                .with_label_values(&[song_status.as_str()])
                .set(count);
        }
    }
}

static UUID_RE: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap()
});

static NUMERIC_RE: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_RE.replace_all(path, "{id}");
    let result = NUMERIC_RE.replace_all(&result, "/{id}$1");
    result.to_string()
}
