//! Unified API error handling with structured responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::user::{UserError, Violation};

/// API error type with structured responses.
///
/// Authentication failures never reach handlers; the auth layers answer
/// those with their own body of the same shape.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(Vec<Violation>),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn into_body(self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        let violations = match self {
            ApiError::Validation(violations) => Some(violations),
            _ => None,
        };

        (
            status,
            ErrorResponse {
                error: message,
                code,
                violations,
            },
        )
    }
}

/// Structured error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(msg) => {
                error!(error_code = self.error_code(), message = %msg, "API error");
            }
            _ => {
                debug!(error_code = self.error_code(), message = %self, "Client error");
            }
        }

        let (status, body) = self.into_body();
        (status, Json(body)).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) | UserError::ClientNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            UserError::InvalidPayload => ApiError::BadRequest(err.to_string()),
            UserError::Validation(violations) => ApiError::Validation(violations),
            // Store failures never leak their details to the caller.
            UserError::Internal(e) => {
                error!("User operation failed: {:#}", e);
                ApiError::Internal("Unexpected storage failure".to_string())
            }
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
