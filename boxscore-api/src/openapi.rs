//! OpenAPI Specification for the boxscore API
//!
//! Generated with utoipa from the route annotations and the error types.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::schools::School;
use crate::routes::{game, schedule, schools, scoreboard, scrape};
use crate::telemetry;

/// OpenAPI document for the boxscore API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "boxscore API",
        description = "Cached JSON over NCAA scoreboards, games, schedules, stats, rankings, standings and history",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    paths(
        scoreboard::scoreboard,
        game::game,
        game::game_page,
        schedule::schedule,
        schedule::schedule_alt,
        schools::schools_index,
        scrape::scrape,
        telemetry::metrics::metrics_handler,
    ),
    components(schemas(ApiError, ErrorCode, School)),
    tags(
        (name = "Scoreboard", description = "Scores for a day, week or playoff round"),
        (name = "Game", description = "Game center summary and game sub-pages"),
        (name = "Schedule", description = "Game dates per season or month"),
        (name = "Schools", description = "Every school with its slug"),
        (name = "Scraped", description = "Tables scraped from stats, rankings, standings and history pages"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Documents the optional `x-ncaa-key` header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "header_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-ncaa-key"))),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
