//! boxscore Core - Shared Types
//!
//! Key and payload types, the error taxonomy, and the upstream contract.
//! Every other crate in the workspace depends on this one; it holds no
//! caching or parsing logic of its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod error;
pub mod upstream;

pub use error::{
    BoxscoreError, BoxscoreResult, ConfigError, ExtractError, FetchError, ValidationError,
};
pub use upstream::Upstream;

// ============================================================================
// PAYLOAD
// ============================================================================

/// Serialized JSON answer as stored in the cache and written to clients.
///
/// Shared rather than copied: one payload may sit under both a
/// [`ResourceKey`] and an [`UpstreamKey`].
pub type Payload = Arc<str>;

// ============================================================================
// CACHE KEYS
// ============================================================================

macro_rules! string_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_key!(
    /// Identifies one logical answer as the client asked for it: the request
    /// path plus the page parameter, if any.
    ResourceKey
);

string_key!(
    /// Canonical identity of an upstream document. Several request shapes
    /// can resolve to the same upstream key and then share one fetch.
    UpstreamKey
);

impl ResourceKey {
    /// Build the key for a request path and optional page parameter.
    ///
    /// Request paths never carry a query string, so `?page=` cannot collide
    /// with a path segment.
    pub fn for_request(path: &str, page: Option<&str>) -> Self {
        match page {
            Some(page) => Self(format!("{}?page={}", path, page)),
            None => Self(path.to_string()),
        }
    }
}
