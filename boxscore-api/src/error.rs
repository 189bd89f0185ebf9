//! Error Types for the boxscore API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - The mapping from core boxscore errors to client-facing statuses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use boxscore_core::{BoxscoreError, ExtractError, FetchError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur while serving a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401)
    // ========================================================================
    /// Request header key is missing or does not match
    Unauthorized,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    /// First path segment is not a served resource
    InvalidResource,

    /// Date in the path is too far in the future
    InvalidDate,

    /// Required path parameter is missing
    MissingField,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Upstream has no document for the request
    ResourceNotFound,

    // ========================================================================
    // Server Errors (500, 502, 504)
    // ========================================================================
    /// Upstream document did not have the expected shape
    ParseFailed,

    /// Upstream could not be reached or sent an unreadable body
    UpstreamUnavailable,

    /// Upstream fetch exceeded the configured limit
    Timeout,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,

            ErrorCode::InvalidInput
            | ErrorCode::InvalidResource
            | ErrorCode::InvalidDate
            | ErrorCode::MissingField => StatusCode::BAD_REQUEST,

            ErrorCode::ResourceNotFound => StatusCode::NOT_FOUND,

            ErrorCode::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::ParseFailed | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::InvalidResource => "Invalid resource",
            ErrorCode::InvalidDate => "Invalid date",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::ResourceNotFound => "Resource not found",
            ErrorCode::ParseFailed => "Could not parse data",
            ErrorCode::UpstreamUnavailable => "Upstream request failed",
            ErrorCode::Timeout => "Upstream request timed out",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
///
/// This type is returned by all API endpoints when an error occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn unauthorized() -> Self {
        Self::from_code(ErrorCode::Unauthorized)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn invalid_resource() -> Self {
        Self::from_code(ErrorCode::InvalidResource)
    }

    pub fn missing_field(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingField, message)
    }

    pub fn not_found() -> Self {
        Self::from_code(ErrorCode::ResourceNotFound)
    }

    pub fn parse_failed() -> Self {
        Self::from_code(ErrorCode::ParseFailed)
    }

    pub fn upstream_unavailable() -> Self {
        Self::from_code(ErrorCode::UpstreamUnavailable)
    }

    pub fn timeout() -> Self {
        Self::from_code(ErrorCode::Timeout)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum.
///
/// ```ignore
/// async fn handler() -> Result<Json<Response>, ApiError> {
///     Err(ApiError::not_found())
/// }
/// ```
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM CORE ERRORS
// ============================================================================

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Status { url, status } => {
                tracing::debug!(url = %url, status, "Upstream answered without a document");
                ApiError::not_found()
            }
            FetchError::Transport { url, reason } | FetchError::Decode { url, reason } => {
                tracing::warn!(url = %url, reason = %reason, "Upstream request failed");
                ApiError::upstream_unavailable()
            }
            FetchError::Timeout { target, after } => {
                tracing::warn!(target_key = %target, ?after, "Upstream request timed out");
                ApiError::timeout()
            }
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        tracing::warn!(error = %err, "Could not parse upstream page");
        ApiError::parse_failed()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        match err {
            ValidationError::Unauthorized => ApiError::unauthorized(),
            ValidationError::InvalidPage { .. } => ApiError::invalid_input(message),
            ValidationError::UnknownResource { .. } => ApiError::invalid_resource(),
            ValidationError::InvalidDate { .. } => ApiError::new(ErrorCode::InvalidDate, message),
            ValidationError::MissingField { .. } => ApiError::missing_field(message),
            ValidationError::UnsupportedDivision { .. } => ApiError::invalid_input(message),
        }
    }
}

impl From<BoxscoreError> for ApiError {
    fn from(err: BoxscoreError) -> Self {
        match err {
            BoxscoreError::Fetch(e) => e.into(),
            BoxscoreError::Extract(e) => e.into(),
            BoxscoreError::Validation(e) => e.into(),
            BoxscoreError::Config(e) => {
                tracing::error!(error = %e, "Configuration error");
                ApiError::internal_error(e.to_string())
            }
            BoxscoreError::Encode(reason) => {
                tracing::error!(reason = %reason, "Could not encode response");
                ApiError::internal_error("Could not encode response")
            }
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {:?}", err);
        ApiError::internal_error(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidResource.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidDate.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ResourceNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ParseFailed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::UpstreamUnavailable.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorCode::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_fetch_errors_map_by_kind() {
        let err: ApiError = FetchError::Status {
            url: "https://data.example/game/1/boxscore.json".to_string(),
            status: 403,
        }
        .into();
        assert_eq!(err.code, ErrorCode::ResourceNotFound);
        assert_eq!(err.message, "Resource not found");

        let err: ApiError = FetchError::Decode {
            url: "https://data.example/x.json".to_string(),
            reason: "expected value".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err: ApiError = FetchError::Timeout {
            target: "/game/1".to_string(),
            after: Duration::from_secs(15),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_validation_errors_keep_their_message() {
        let err: ApiError = BoxscoreError::from(ValidationError::InvalidPage {
            value: "2a".to_string(),
        })
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Page parameter must be an integer");

        let err: ApiError = ValidationError::MissingField {
            field: "Game id".to_string(),
        }
        .into();
        assert_eq!(err.message, "Game id is required");

        let err: ApiError = ValidationError::Unauthorized.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_extract_error_is_parse_failure() {
        let err: ApiError = BoxscoreError::from(ExtractError::MissingElement {
            selector: "main table".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ParseFailed);
        assert_eq!(err.message, "Could not parse data");
    }

    #[test]
    fn test_api_error_with_details() {
        let details = serde_json::json!({ "resource": "teams" });
        let err = ApiError::invalid_resource().with_details(details.clone());
        assert_eq!(err.code, ErrorCode::InvalidResource);
        assert_eq!(err.details, Some(details));
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::invalid_resource();
        let json = serde_json::to_string(&err)?;

        assert!(json.contains("INVALID_RESOURCE"));
        assert!(json.contains("Invalid resource"));
        assert!(!json.contains("details"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }
}
