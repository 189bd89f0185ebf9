//! boxscore API - Caching HTTP front for NCAA data
//!
//! Serves scoreboards, game details, schedules, the schools index and
//! scraped stats, rankings, standings and history tables as JSON. Every
//! response is read through a two-tier TTL cache with per-key request
//! coalescing, so concurrent requests for the same document trigger one
//! upstream fetch.

#[macro_use]
pub mod macros;

pub mod codes;
pub mod config;
pub mod error;
pub mod openapi;
pub mod resource;
pub mod routes;
pub mod scoreboard;
pub mod state;
pub mod telemetry;
pub mod upstream;

// Re-export commonly used types
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use resource::{CacheTier, Resource, ResourceContext};
pub use routes::create_router;
pub use state::{AppState, CacheTiers};
pub use upstream::{HttpUpstream, UpstreamUrls};
