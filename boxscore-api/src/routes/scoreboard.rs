//! Scoreboard route.

use axum::{
    extract::{Path, State},
    response::Response,
    Extension,
};

use crate::error::ApiResult;
use crate::resource::ResourceContext;
use crate::routes::payload_response;
use crate::scoreboard;
use crate::state::AppState;

/// GET /scoreboard/{sport}/{division}/... - Scores for a day or week
///
/// Without a date the current period is used: `today.json` first, then the
/// schedules query.
#[utoipa::path(
    get,
    path = "/scoreboard/{sport}/{rest}",
    tag = "Scoreboard",
    params(
        ("sport" = String, Path, description = "Sport slug, e.g. `football`"),
        ("rest" = String, Path, description = "Division, then optional `YYYY/MM/DD`, `YYYY/WW` or `YYYY/P`"),
    ),
    responses(
        (status = 200, description = "Scoreboard in the legacy `scoreboard.json` shape"),
        (status = 400, description = "Missing division or invalid date", body = crate::error::ApiError),
        (status = 404, description = "No scoreboard upstream", body = crate::error::ApiError),
    ),
)]
pub async fn scoreboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResourceContext>,
    Path((sport, rest)): Path<(String, String)>,
) -> ApiResult<Response> {
    let read = scoreboard::read(&state, &ctx.cache_key, &sport, &rest).await?;
    Ok(payload_response(read, true))
}
