//! API error types
//!
//! Every failure leaves the facade as `{"success": false, "message", "error"}`.
//! Caller mistakes map to 400; anything that went wrong upstream maps to 500
//! with a generic message, the cause stays in the log.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use drift_analytics::AnalyticsError;
use drift_sources::SourceError;
use drift_store::StoreError;

const UPSTREAM_MESSAGE: &str = "upstream data unavailable, please retry later";

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request parameters
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Validation error
    #[error("validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Unknown route under `/api`
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Source(SourceError::UnknownPlatform(_))
            | Self::Analytics(AnalyticsError::Source(SourceError::UnknownPlatform(_))) => {
                StatusCode::BAD_REQUEST
            }
            Self::Analytics(_) | Self::Source(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Analytics(_) => "ANALYTICS_ERROR",
            Self::Source(SourceError::UnknownPlatform(_)) => "UNKNOWN_PLATFORM",
            Self::Source(_) => "SOURCE_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Create a validation error
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Message shown to the caller; server-side causes are not exposed
    fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            UPSTREAM_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    /// Error message (human-readable)
    pub message: String,
    /// Error code (machine-readable)
    pub error: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            message: self.public_message(),
            error: self.code(),
        };

        if status.is_server_error() {
            tracing::error!(
                error_code = body.error,
                error = %self,
                status = %status,
                "API request failed upstream"
            );
        } else {
            tracing::warn!(
                error_code = body.error,
                error_message = %body.message,
                status = %status,
                "API error"
            );
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
