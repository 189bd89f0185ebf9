//! REST API Routes Module
//!
//! Every data route is a cached read of one upstream document:
//! - Scoreboards (shared fetch across date spellings)
//! - Game details and game sub-pages
//! - Schedules (month files and the schedules query) and the schools index
//! - Scraped stats, rankings, standings and history pages (fallback)
//!
//! A single middleware validates each data request, builds its cache key
//! and stamps cache headers on the way out.

pub mod game;
pub mod schedule;
pub mod schools;
pub mod scoreboard;
pub mod scrape;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use boxscore_cache::CacheRead;
use boxscore_core::ValidationError;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::resource::{CacheTier, ResourceContext};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

/// Header carrying the shared key when one is configured.
pub const HEADER_KEY: &str = "x-ncaa-key";

/// Set on scoreboard responses served without a fetch of their own.
pub const CACHE_HIT_HEADER: &str = "x-score-cache";

// ============================================================================
// REQUEST RESOLUTION
// ============================================================================

/// Validate a data request before its handler runs.
///
/// Checks the header key, the `page` parameter and the resource name, then
/// hands the handler a [`ResourceContext`]. Successful responses leave with
/// a JSON content type and a `Cache-Control` matching the resource's tier.
pub async fn resolve_resource(
    State(config): State<Arc<ApiConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Err(err) = authorize(&config, request.headers()) {
        return ApiError::from(err).into_response();
    }

    let page = page_param(request.uri().query());
    let ctx = match ResourceContext::resolve(request.uri().path(), page) {
        Ok(ctx) => ctx,
        Err(err) => return ApiError::from(err).into_response(),
    };
    let tier = ctx.tier;
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    if response.status().is_success() {
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = cache_control(&config, tier).parse() {
            headers.insert(header::CACHE_CONTROL, value);
        }
    }
    response
}

fn authorize(config: &ApiConfig, headers: &HeaderMap) -> Result<(), ValidationError> {
    let Some(expected) = config.header_key.as_deref() else {
        return Ok(());
    };
    let provided = headers.get(HEADER_KEY).and_then(|value| value.to_str().ok());
    if provided == Some(expected) {
        Ok(())
    } else {
        Err(ValidationError::Unauthorized)
    }
}

/// Raw `page` query value. An empty value counts as absent.
fn page_param(query: Option<&str>) -> Option<&str> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("page="))
        .filter(|page| !page.is_empty())
}

fn cache_control(config: &ApiConfig, tier: CacheTier) -> String {
    let ttl = match tier {
        CacheTier::Long => config.long_ttl,
        CacheTier::Short => config.short_ttl,
    };
    format!("public, max-age={}", ttl.as_secs())
}

/// Turn a cache read into a response body. `mark_hit` adds
/// [`CACHE_HIT_HEADER`] when the read was served from cache.
pub(crate) fn payload_response(read: CacheRead, mark_hit: bool) -> Response {
    let hit = read.was_cache_hit();
    let mut response = (StatusCode::OK, read.into_value().to_string()).into_response();
    if mark_hit && hit {
        response.headers_mut().insert(
            HeaderName::from_static(CACHE_HIT_HEADER),
            HeaderValue::from_static("hit"),
        );
    }
    response
}

// ============================================================================
// PUBLIC ROUTES
// ============================================================================

/// GET / - Redirect to the API documentation
pub async fn home(State(config): State<Arc<ApiConfig>>) -> Redirect {
    Redirect::temporary(&config.home_redirect)
}

/// GET /openapi.json - OpenAPI document
pub async fn openapi_json() -> impl IntoResponse {
    Json(<ApiDoc as utoipa::OpenApi>::openapi())
}

// ============================================================================
// ROUTER
// ============================================================================

/// Build the CORS layer from configuration.
///
/// With no configured origins every origin is allowed. Configured origins
/// match exactly or, for `*.domain` entries, by HTTPS subdomain.
fn build_cors_layer(config: &Arc<ApiConfig>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(HEADER_KEY),
        ])
        .expose_headers([HeaderName::from_static(CACHE_HIT_HEADER)])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!("CORS: allowing origins: {:?}", config.cors_origins);
        let config = Arc::clone(config);
        cors.allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .is_ok_and(|origin| config.is_origin_allowed(origin))
        }))
    }
}

/// Create the complete router.
///
/// Data routes sit behind [`resolve_resource`]; anything they do not match
/// falls through to the scrape handler, so unknown resources still get the
/// resolver's 400.
pub fn create_router(state: AppState) -> Router {
    let data = Router::new()
        .route("/scoreboard/:sport/*rest", get(scoreboard::scoreboard))
        .route("/game", get(game::game_without_id))
        .route("/game/:id", get(game::game))
        .route("/game/:id/:page", get(game::game_page))
        .route(
            "/schedule/:sport/:division/*rest",
            get(schedule::schedule),
        )
        .route(
            "/schedule-alt/:sport/:division/:year",
            get(schedule::schedule_alt),
        )
        .route("/schools-index", get(schools::schools_index))
        .fallback(scrape::scrape)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            resolve_resource,
        ));

    let mut public = Router::new()
        .route("/", get(home))
        .route("/openapi.json", get(openapi_json));
    if state.config.metrics_enabled {
        public = public.route("/metrics", get(metrics_handler));
    }

    public
        .merge(data)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            observability_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&state.config))
        .with_state(state)
}
