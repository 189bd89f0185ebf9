//! Schedule routes.

use axum::{
    extract::{Path, State},
    response::Response,
    Extension,
};
use boxscore_core::{BoxscoreError, Payload, ValidationError};
use serde_json::Value;

use crate::codes;
use crate::error::ApiResult;
use crate::resource::ResourceContext;
use crate::routes::payload_response;
use crate::state::AppState;

/// GET /schedule/{sport}/{division}/{rest} - Game dates for a season or month
#[utoipa::path(
    get,
    path = "/schedule/{sport}/{division}/{rest}",
    tag = "Schedule",
    params(
        ("sport" = String, Path, description = "Sport slug"),
        ("division" = String, Path, description = "Division slug"),
        ("rest" = String, Path, description = "Year, or year and month, e.g. `2024/11`"),
    ),
    responses(
        (status = 200, description = "Upstream schedule document"),
        (status = 404, description = "No schedule upstream", body = crate::error::ApiError),
    ),
)]
pub async fn schedule(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResourceContext>,
    Path((sport, division, rest)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let url = state.urls.schedule(&sport, &division, &rest);
    let url = &url;
    let upstream = &state.upstream;

    let read = state
        .read(ctx.tier, &ctx.cache_key, move || async move {
            tracing::info!(url = %url, "Fetching schedule");
            let body = upstream.get_json(url).await?;
            Ok::<Payload, BoxscoreError>(body.to_string().into())
        })
        .await?;
    Ok(payload_response(read, false))
}

/// GET /schedule-alt/{sport}/{division}/{year} - Game dates from the schedules query
#[utoipa::path(
    get,
    path = "/schedule-alt/{sport}/{division}/{year}",
    tag = "Schedule",
    params(
        ("sport" = String, Path, description = "Sport slug"),
        ("division" = String, Path, description = "Division slug"),
        ("year" = i32, Path, description = "Season year, e.g. `2025`"),
    ),
    responses(
        (status = 200, description = "The `schedules` object of the schedules query"),
        (status = 400, description = "Bad year, or a sport and division the query does not cover", body = crate::error::ApiError),
        (status = 502, description = "Upstream failed", body = crate::error::ApiError),
    ),
)]
pub async fn schedule_alt(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResourceContext>,
    Path((sport, division, year)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let (sport_code, division_code) = codes::division_code(&sport, &division).ok_or_else(|| {
        ValidationError::UnsupportedDivision {
            sport: sport.clone(),
            division: division.clone(),
        }
    })?;
    let season_year = season_year(&year)?;
    let url = state.urls.schedules(sport_code, division_code, season_year);
    let url = &url;
    let upstream = &state.upstream;

    let read = state
        .read(ctx.tier, &ctx.cache_key, move || async move {
            tracing::info!(url = %url, "Fetching schedules query");
            let body = upstream.get_json(url).await?;
            let schedules = body
                .pointer("/data/schedules")
                .cloned()
                .unwrap_or(Value::Null);
            Ok::<Payload, BoxscoreError>(schedules.to_string().into())
        })
        .await?;
    Ok(payload_response(read, false))
}

fn season_year(raw: &str) -> Result<i32, ValidationError> {
    let invalid = || ValidationError::InvalidDate {
        date: raw.to_string(),
    };
    if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    raw.parse().map_err(|_| invalid())
}
