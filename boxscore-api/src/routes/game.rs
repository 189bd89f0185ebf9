//! Game routes.

use axum::{
    extract::{Path, State},
    response::Response,
    Extension,
};
use boxscore_core::{BoxscoreError, Payload, ValidationError};
use serde_json::Value;

use crate::error::ApiResult;
use crate::resource::ResourceContext;
use crate::routes::payload_response;
use crate::state::AppState;

/// Upstream file name for a game sub-page. Readable aliases map to the
/// names the data host uses; anything else passes through.
pub fn page_file(page: &str) -> &str {
    match page {
        "play-by-play" => "pbp",
        "scoring-summary" => "scoringSummary",
        "team-stats" => "teamStats",
        other => other,
    }
}

/// GET /game - Always rejected, a game id is required
pub async fn game_without_id() -> ApiResult<Response> {
    Err(ValidationError::MissingField {
        field: "Game id".to_string(),
    }
    .into())
}

/// GET /game/{id} - Game center summary
#[utoipa::path(
    get,
    path = "/game/{id}",
    tag = "Game",
    params(("id" = String, Path, description = "Game id")),
    responses(
        (status = 200, description = "The `data` member of the game center response"),
        (status = 404, description = "Unknown game", body = crate::error::ApiError),
    ),
)]
pub async fn game(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResourceContext>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let url = state.urls.game_center(&id);
    let url = &url;
    let upstream = &state.upstream;

    let read = state
        .read(ctx.tier, &ctx.cache_key, move || async move {
            tracing::info!(url = %url, "Fetching game center");
            let mut body = upstream.get_json(url).await?;
            let data = body.get_mut("data").map(Value::take).unwrap_or(Value::Null);
            Ok::<Payload, BoxscoreError>(data.to_string().into())
        })
        .await?;
    Ok(payload_response(read, false))
}

/// GET /game/{id}/{page} - Box score, play-by-play, scoring summary or team stats
#[utoipa::path(
    get,
    path = "/game/{id}/{page}",
    tag = "Game",
    params(
        ("id" = String, Path, description = "Game id"),
        ("page" = String, Path, description = "`boxscore`, `play-by-play`, `scoring-summary` or `team-stats`"),
    ),
    responses(
        (status = 200, description = "Upstream game document"),
        (status = 404, description = "Unknown game or page", body = crate::error::ApiError),
    ),
)]
pub async fn game_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResourceContext>,
    Path((id, page)): Path<(String, String)>,
) -> ApiResult<Response> {
    let url = state.urls.game_page(&id, page_file(&page));
    let url = &url;
    let upstream = &state.upstream;

    let read = state
        .read(ctx.tier, &ctx.cache_key, move || async move {
            tracing::info!(url = %url, "Fetching game page");
            let body = upstream.get_json(url).await?;
            Ok::<Payload, BoxscoreError>(body.to_string().into())
        })
        .await?;
    Ok(payload_response(read, false))
}
