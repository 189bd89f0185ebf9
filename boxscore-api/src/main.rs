//! boxscore API Server Entry Point
//!
//! Bootstraps logging, metrics and configuration, starts the cache
//! sweepers and serves the Axum router.

use std::net::SocketAddr;

use axum::Router;
use boxscore_api::telemetry::{init_tracer, TelemetryConfig, METRICS};
use boxscore_api::{create_router, ApiConfig, ApiError, ApiResult, AppState};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let config = ApiConfig::from_env();
    config
        .validate()
        .map_err(|e| ApiError::internal_error(format!("Invalid configuration: {}", e)))?;

    if config.metrics_enabled {
        if let Err(e) = METRICS.as_ref() {
            tracing::warn!(error = %e, "Prometheus metrics unavailable");
        }
    } else {
        tracing::info!("Metrics disabled");
    }

    let state = AppState::with_http_upstream(config)?;
    let _sweepers = state.caches.spawn_sweepers(state.config.sweep_interval);

    let app: Router = create_router(state);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting boxscore API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("BOXSCORE_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("BOXSCORE_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str.parse::<u16>().map_err(|_| {
        ApiError::invalid_input(format!("Invalid port value: {}", port_str))
    })?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>().map_err(|e| {
        ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
    })
}
