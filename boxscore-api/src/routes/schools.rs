//! Schools index route.

use axum::{extract::State, response::Response, Extension};
use boxscore_core::{BoxscoreError, FetchError, Payload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiResult;
use crate::resource::ResourceContext;
use crate::routes::payload_response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct UpstreamSchool {
    slug: Option<String>,
    name: Option<String>,
    long_name: Option<String>,
}

/// One entry of the schools index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct School {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
}

impl From<UpstreamSchool> for School {
    fn from(school: UpstreamSchool) -> Self {
        let trim = |s: String| s.trim().to_string();
        Self {
            slug: school.slug,
            name: school.name.map(trim),
            long: school.long_name.map(trim),
        }
    }
}

/// Reshape the upstream school list.
pub fn to_schools(url: &str, body: Value) -> Result<Vec<School>, FetchError> {
    let schools: Vec<UpstreamSchool> =
        serde_json::from_value(body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    Ok(schools.into_iter().map(School::from).collect())
}

/// GET /schools-index - Every school with its slug and names
#[utoipa::path(
    get,
    path = "/schools-index",
    tag = "Schools",
    responses(
        (status = 200, description = "All schools", body = Vec<School>),
        (status = 502, description = "Upstream list unavailable", body = crate::error::ApiError),
    ),
)]
pub async fn schools_index(
    State(state): State<AppState>,
    Extension(ctx): Extension<ResourceContext>,
) -> ApiResult<Response> {
    let url = state.urls.schools();
    let url = &url;
    let upstream = &state.upstream;

    let read = state
        .read(ctx.tier, &ctx.cache_key, move || async move {
            tracing::info!(url = %url, "Fetching schools index");
            let body = upstream.get_json(url).await?;
            let schools = to_schools(url, body)?;
            Ok::<Payload, BoxscoreError>(serde_json::to_string(&schools)?.into())
        })
        .await?;
    Ok(payload_response(read, false))
}
