//! Axum Middleware for HTTP Request Logging and Metrics
//!
//! Every request gets a tracing span, a Prometheus observation and a
//! completion log line. Paths are normalized before they become labels.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::METRICS;
use crate::config::ApiConfig;

static ID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+|[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})$")
        .expect("Invalid ID segment regex")
});

/// Normalize path for metrics/spans (replace numeric and UUID segments with
/// `{id}`).
///
/// Game ids, dates and weeks all become `{id}`, which keeps the `path` label
/// bounded.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if ID_SEGMENT.is_match(segment) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Observability middleware for Axum.
///
/// This middleware wraps every request with:
/// 1. A tracing span carrying method and route
/// 2. Prometheus metrics recording, when enabled
/// 3. Request/response logging
pub async fn observability_middleware(
    State(config): State<Arc<ApiConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %normalized_path,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();

    if config.metrics_enabled {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_http_request(
                method.as_str(),
                &normalized_path,
                status.as_u16(),
                duration.as_secs_f64(),
            );
        }
    }

    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}
