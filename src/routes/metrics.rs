//! Prometheus metrics endpoint
//!
//! Exposes relay metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;
    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "relay_requests_total",
        "Total number of relay requests by route"
    );
    metrics::describe_counter!(
        "relay_stream_errors_total",
        "Upstream errors surfaced in-band"
    );
    metrics::describe_counter!(
        "relay_fragments_total",
        "Encoded fragments written to clients by kind"
    );
    metrics::describe_histogram!(
        "relay_stream_duration_seconds",
        "Time from request to end of stream in seconds"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record an accepted relay request
pub fn record_request(endpoint: &str, route: &str) {
    metrics::counter!(
        "relay_requests_total",
        "endpoint" => endpoint.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
}

/// Record an in-band upstream error
pub fn record_stream_error(route: &str) {
    metrics::counter!("relay_stream_errors_total", "route" => route.to_string()).increment(1);
}

/// Record one encoded fragment
pub fn record_fragment(kind: &'static str) {
    metrics::counter!("relay_fragments_total", "kind" => kind).increment(1);
}

/// Record how long a stream stayed open
pub fn record_stream_duration(route: &str, outcome: &'static str, duration_secs: f64) {
    metrics::histogram!(
        "relay_stream_duration_seconds",
        "route" => route.to_string(),
        "outcome" => outcome
    )
    .record(duration_secs);
}
