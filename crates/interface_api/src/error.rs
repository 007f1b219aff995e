//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use core_kernel::PortError;
use domain_sync::SyncError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The order write committed but the ledger did not follow
    #[error("Partially applied: {message}")]
    PartiallyApplied {
        message: String,
        stage: String,
        intent_id: String,
    },

    /// A backing store could not be reached
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Validation { message, field } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                message,
                field.map(|f| vec![format!("field={}", f)]),
            ),
            ApiError::PartiallyApplied { message, stage, intent_id } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "partially_applied",
                message,
                Some(vec![format!("stage={}", stage), format!("intent_id={}", intent_id)]),
            ),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_unavailable", msg, None),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::Validation { field, message } => ApiError::Validation {
                message,
                field: Some(field),
            },
            SyncError::StalePreviousStatus { .. } => ApiError::Conflict(message),
            SyncError::PartiallyApplied { stage, intent_id, .. } => {
                tracing::warn!(%stage, %intent_id, "Returning partially applied mutation");
                ApiError::PartiallyApplied {
                    message,
                    stage: stage.to_string(),
                    intent_id: intent_id.to_string(),
                }
            }
            SyncError::Accessor { source, .. } => match source {
                PortError::NotFound { .. } => ApiError::NotFound(message),
                PortError::Conflict { .. } => ApiError::Conflict(message),
                PortError::Validation { field, .. } => ApiError::Validation { message, field },
                e if e.is_transient() => ApiError::Upstream(message),
                _ => ApiError::Internal(message),
            },
        }
    }
}
