//! Upstream fetch contract.
//!
//! The cache core never talks HTTP itself. Route handlers hand it a closure
//! that calls into an [`Upstream`], which lets tests swap the network for a
//! scripted mock.

use async_trait::async_trait;

use crate::error::FetchError;

/// Source of upstream JSON documents and HTML pages.
///
/// Implementations report any non-success HTTP status as
/// [`FetchError::Status`]; callers decide what that status means to a client.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch `url` and decode the body as JSON.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError>;

    /// Fetch `url` and return the body as text.
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}
