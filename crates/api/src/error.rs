//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use choreography::ChoreographyError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// The request conflicts with the order's lifecycle or a concurrent write.
    Conflict(String),
    /// A dependency (store or bus) is unavailable.
    Unavailable(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "dependency unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service temporarily unavailable".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ChoreographyError> for ApiError {
    fn from(err: ChoreographyError) -> Self {
        match err {
            ChoreographyError::Validation(_) => ApiError::BadRequest(err.to_string()),
            ChoreographyError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ChoreographyError::Conflict { .. } | ChoreographyError::RejectedTransition { .. } => {
                ApiError::Conflict(err.to_string())
            }
            ChoreographyError::Transport(_) | ChoreographyError::Publish(_) => {
                ApiError::Unavailable(err.to_string())
            }
            ChoreographyError::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}
