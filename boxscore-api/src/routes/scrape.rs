//! Scraped HTML pages: stats, rankings, standings and history.

use axum::{extract::State, http::Uri, response::Response, Extension};
use boxscore_core::{BoxscoreError, Payload};
use boxscore_extract::{extract_page, PageKind};

use crate::error::{ApiError, ApiResult};
use crate::resource::{Resource, ResourceContext};
use crate::routes::payload_response;
use crate::state::AppState;

/// Fallback for every data path without a dedicated route.
///
/// Only scraped resources are served here; other resources with an
/// unmatched shape (e.g. `/scoreboard/football`) are not found.
#[utoipa::path(
    get,
    path = "/{resource}/{rest}",
    tag = "Scraped",
    params(
        ("resource" = String, Path, description = "`stats`, `rankings`, `standings` or `history`"),
        ("rest" = String, Path, description = "Path of the page on the web host"),
        ("page" = Option<u32>, Query, description = "Pager page, 1-based"),
    ),
    responses(
        (status = 200, description = "Table rows with page title, sport and pager"),
        (status = 400, description = "Invalid resource or page", body = crate::error::ApiError),
        (status = 404, description = "No such page", body = crate::error::ApiError),
        (status = 500, description = "Page layout not recognized", body = crate::error::ApiError),
    ),
)]
pub async fn scrape(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResourceContext>,
    uri: Uri,
) -> ApiResult<Response> {
    if !ctx.resource.is_scraped() {
        return Err(ApiError::not_found());
    }

    let kind = match ctx.resource {
        Resource::Standings => PageKind::Standings,
        _ => PageKind::Table,
    };
    let url = state.urls.page(uri.path(), ctx.page);
    let url = &url;
    let upstream = &state.upstream;

    let read = state
        .read(ctx.tier, &ctx.cache_key, move || async move {
            tracing::info!(url = %url, "Scraping page");
            let html = upstream.get_text(url).await?;
            let page = extract_page(&html, kind)?;
            Ok::<Payload, BoxscoreError>(serde_json::to_string(&page)?.into())
        })
        .await?;
    Ok(payload_response(read, false))
}
