//! Prometheus metrics for geo-service.

use super::error::GeoError;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// HTTP request counter by method and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "geo_http_requests_total",
        "Total number of HTTP requests",
        &["method", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// Tree operations by outcome (`ok` or a `GeoError` kind).
pub static OPERATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "geo_operations_total",
        "Total number of geo tree operations",
        &["operation", "status"]
    )
    .expect("Failed to register operations_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "geo_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Descendants whose path was rewritten by a rename or move.
pub static NODES_REWRITTEN: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "geo_nodes_rewritten_total",
        "Total number of descendant nodes rewritten by cascading updates",
        &["operation"]
    )
    .expect("Failed to register nodes_rewritten")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&OPERATIONS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&NODES_REWRITTEN);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

/// Record the outcome of a tree operation.
pub fn record_operation<T>(operation: &str, result: &Result<T, GeoError>) {
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}
