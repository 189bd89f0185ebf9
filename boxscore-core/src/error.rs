//! Error types for boxscore operations

use std::time::Duration;
use thiserror::Error;

/// Upstream fetch errors.
///
/// Any of these leaves the cache untouched, so the next request for the same
/// key goes back to the upstream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Upstream {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Invalid response body from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Fetch for {target} timed out after {after:?}")]
    Timeout { target: String, after: Duration },
}

impl FetchError {
    /// HTTP status reported by the upstream, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Document extraction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Required element missing: {selector}")]
    MissingElement { selector: String },

    #[error("Section '{section}' is not followed by a table")]
    OrphanSection { section: String },

    #[error("Invalid selector {selector}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Caller input errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Page parameter must be an integer")]
    InvalidPage { value: String },

    #[error("Invalid resource")]
    UnknownResource { resource: String },

    #[error("Invalid date")]
    InvalidDate { date: String },

    #[error("{field} is required")]
    MissingField { field: String },

    #[error("{sport} {division} has no schedule query")]
    UnsupportedDivision { sport: String, division: String },

    #[error("Unauthorized")]
    Unauthorized,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all boxscore errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoxscoreError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Encode error: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for BoxscoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

/// Result type alias for boxscore operations.
pub type BoxscoreResult<T> = Result<T, BoxscoreError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_status() {
        let err = FetchError::Status {
            url: "https://data.example/today.json".to_string(),
            status: 404,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("404"));
        assert!(msg.contains("today.json"));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_fetch_error_timeout_has_no_status() {
        let err = FetchError::Timeout {
            target: "/scoreboard/baseball/d1".to_string(),
            after: Duration::from_secs(15),
        };
        assert_eq!(err.status(), None);
        assert!(format!("{}", err).contains("timed out"));
    }

    #[test]
    fn test_validation_error_messages_are_client_facing() {
        let err = ValidationError::InvalidPage {
            value: "two".to_string(),
        };
        assert_eq!(err.to_string(), "Page parameter must be an integer");

        let err = ValidationError::MissingField {
            field: "Game id".to_string(),
        };
        assert_eq!(err.to_string(), "Game id is required");

        let err = ValidationError::UnsupportedDivision {
            sport: "cricket".to_string(),
            division: "d1".to_string(),
        };
        assert_eq!(err.to_string(), "cricket d1 has no schedule query");
    }

    #[test]
    fn test_boxscore_error_from_conversions() {
        let err: BoxscoreError = ExtractError::MissingElement {
            selector: "main table".to_string(),
        }
        .into();
        assert!(matches!(err, BoxscoreError::Extract(_)));
        assert!(err.to_string().contains("main table"));

        let err: BoxscoreError = ValidationError::Unauthorized.into();
        assert!(matches!(err, BoxscoreError::Validation(_)));
    }
}
