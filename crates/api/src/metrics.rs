// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics module
//!
//! Provides global metrics using the default Prometheus registry via macros and
//! an Axum-compatible metrics handler.

use std::sync::LazyLock;

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, Gauge, HistogramVec, IntCounterVec, IntGauge, TextEncoder, register_gauge,
    register_histogram_vec, register_int_counter_vec, register_int_gauge,
};
use tracing::error;
use whois_resolver::{CacheBackend, CacheStats};

use crate::state::ServerState;

/// Total number of lookups, labeled by cache outcome (`hit`, `miss` or `error`).
pub static LOOKUPS_BY_CACHE_STATUS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "whois_api_lookups_total",
        "Total number of WHOIS lookups, labeled by cache status",
        &["cache_status"]
    )
    .expect("Failed to create whois_api_lookups_total counter vec")
});

/// Histogram for end-to-end resolution durations in seconds.
pub static RESOLUTION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "whois_api_resolution_duration_seconds",
        "WHOIS resolution durations in seconds",
        &["result"],
        vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to create resolution duration histogram")
});

/// Cache hit rate gauge
pub static CACHE_HIT_RATE: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge!(
        "whois_api_cache_hit_rate",
        "Cache hit rate as a ratio (0.0 to 1.0)"
    )
    .expect("Failed to create cache hit rate gauge")
});

/// Cache size gauge
pub static CACHE_SIZE: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!(
        "whois_api_cache_entries_count",
        "Approximate number of entries in the cache backend"
    )
    .expect("Failed to create cache size gauge")
});

/// Evictions performed so far
pub static CACHE_EVICTIONS: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!(
        "whois_api_cache_evictions",
        "Entries removed by size-bound eviction since startup"
    )
    .expect("Failed to create cache evictions gauge")
});

/// Count a lookup by its cache outcome
pub fn inc_lookups(cache_status: &str) {
    LOOKUPS_BY_CACHE_STATUS
        .with_label_values(&[cache_status])
        .inc();
}

/// Observe the duration of a resolution
///
/// # Arguments
/// * `result` - `hit`, `miss`, `no_provider` or `exhausted`
/// * `duration_secs` - The duration of the resolution in seconds
pub fn observe_resolution_duration(result: &str, duration_secs: f64) {
    RESOLUTION_DURATION
        .with_label_values(&[result])
        .observe(duration_secs);
}

/// Update cache gauges from the record cache counters
pub fn update_cache_metrics(stats: &CacheStats, entry_count: Option<u64>) {
    CACHE_HIT_RATE.set(stats.hit_rate);
    CACHE_EVICTIONS.set(i64::try_from(stats.evictions).unwrap_or(i64::MAX));
    if let Some(entries) = entry_count {
        CACHE_SIZE.set(i64::try_from(entries).unwrap_or(i64::MAX));
    }
}

/// Axum handler that exports metrics in Prometheus text format
///
/// Cache gauges are refreshed from the backend before gathering.
pub async fn metrics_handler(State(state): State<ServerState>) -> Response {
    let cache = state.resolver().cache();
    let entries = match cache.backend().approximate_len().await {
        Ok(entries) => Some(entries),
        Err(e) => {
            error!(error = %e, "failed to read cache size for metrics");
            None
        }
    };
    update_cache_metrics(&cache.stats(), entries);

    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
