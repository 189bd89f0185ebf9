//! Prometheus Metrics Definitions
//!
//! Defines all boxscore metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 15s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 15.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<BoxscoreMetrics>> = Lazy::new(BoxscoreMetrics::new);

/// Container for all boxscore metrics.
#[derive(Clone)]
pub struct BoxscoreMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Cache lookup counter - labels: tier, outcome (hit/miss)
    pub cache_lookups_total: CounterVec,

    /// Upstream fetch counter - labels: kind (json/html), outcome (status code or error)
    pub upstream_fetches_total: CounterVec,
}

impl BoxscoreMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "boxscore_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(registration_error("http_requests_total"))?,

            http_request_duration_seconds: register_histogram_vec!(
                "boxscore_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(registration_error("http_request_duration_seconds"))?,

            cache_lookups_total: register_counter_vec!(
                "boxscore_cache_lookups_total",
                "Cache lookups by tier and outcome",
                &["tier", "outcome"]
            )
            .map_err(registration_error("cache_lookups_total"))?,

            upstream_fetches_total: register_counter_vec!(
                "boxscore_upstream_fetches_total",
                "Upstream fetches by kind and outcome",
                &["kind", "outcome"]
            )
            .map_err(registration_error("upstream_fetches_total"))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record whether a read was answered from the cache.
    pub fn record_cache_lookup(&self, tier: &str, hit: bool) {
        let outcome = if hit { "hit" } else { "miss" };
        self.cache_lookups_total
            .with_label_values(&[tier, outcome])
            .inc();
    }

    /// Record an upstream fetch.
    pub fn record_upstream_fetch(&self, kind: &str, outcome: &str) {
        self.upstream_fetches_total
            .with_label_values(&[kind, outcome])
            .inc();
    }
}

fn registration_error(metric: &'static str) -> impl FnOnce(prometheus::Error) -> ApiError {
    move |e| ApiError::internal_error(format!("Failed to register {}: {}", metric, e))
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
