//! Error Types for the repograph HTTP services
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.
//! An error response never carries a partial artifact.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use repograph_core::{ArtifactFormat, RepoId, RepographError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request data is malformed
    InvalidInput,

    /// Repository identity failed validation
    InvalidRepository,

    /// Requested artifact suffix is not one of the supported formats
    InvalidFormat,

    // ========================================================================
    // Pipeline Errors (500)
    // ========================================================================
    /// Source tree could not be obtained
    ResolutionFailed,

    /// Dependency graph could not be extracted
    ExtractionFailed,

    /// Graph description could not be rendered
    RenderFailed,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    InternalError,

    /// The cache store or a dependent service is unreachable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::InvalidRepository | ErrorCode::InvalidFormat => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::ResolutionFailed
            | ErrorCode::ExtractionFailed
            | ErrorCode::RenderFailed
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::InvalidRepository => "Invalid repository",
            ErrorCode::InvalidFormat => "Unsupported format",
            ErrorCode::ResolutionFailed => "Source could not be resolved",
            ErrorCode::ExtractionFailed => "Dependency graph could not be extracted",
            ErrorCode::RenderFailed => "Graph could not be rendered",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
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

/// Structured error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
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

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create an InvalidFormat error for an unsupported artifact suffix.
    pub fn invalid_format(path: &str) -> Self {
        let expected: Vec<&str> = ArtifactFormat::ALL.iter().map(|f| f.suffix()).collect();
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Unsupported format for '{}'", path),
        )
        .with_details(serde_json::json!({ "expected": expected }))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Wrap a pipeline failure for `repo` in the requested `format`.
    ///
    /// The message names the artifact the client asked for.
    pub fn artifact_failed(repo: &RepoId, format: ArtifactFormat, err: RepographError) -> Self {
        let base = ApiError::from(err);
        match base.code {
            ErrorCode::ResolutionFailed | ErrorCode::ExtractionFailed | ErrorCode::RenderFailed => {
                Self::new(
                    base.code,
                    format!(
                        "Failed to generate {}{}: {}",
                        repo,
                        format.suffix(),
                        base.message
                    ),
                )
            }
            _ => base,
        }
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

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

/// Convert pipeline errors to ApiError.
impl From<RepographError> for ApiError {
    fn from(err: RepographError) -> Self {
        match &err {
            RepographError::InvalidRepo { .. } => {
                ApiError::new(ErrorCode::InvalidRepository, err.to_string())
            }
            RepographError::Resolution { .. } => {
                ApiError::new(ErrorCode::ResolutionFailed, err.to_string())
            }
            RepographError::Extraction { .. } => {
                ApiError::new(ErrorCode::ExtractionFailed, err.to_string())
            }
            RepographError::Render { .. } => ApiError::new(ErrorCode::RenderFailed, err.to_string()),
            RepographError::Cache(_) => {
                tracing::error!(error = %err, "Cache store error");
                ApiError::service_unavailable("Cache store unavailable")
            }
            RepographError::Command(_) => {
                tracing::error!(error = %err, "Command error escaped the pipeline");
                ApiError::from_code(ErrorCode::InternalError)
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

pub type ApiResult<T> = Result<T, ApiError>;
