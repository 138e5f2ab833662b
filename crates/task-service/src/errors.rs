use crate::models::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Fixed message for every authentication failure.
///
/// Missing, malformed, forged, expired and unknown-subject tokens all produce
/// this exact text so callers cannot tell which check failed.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Authentication token is missing or invalid";

/// Message for failed logins (unknown email and wrong password alike).
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Authentication failed: Invalid email or password";

/// Message for any server-side fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(BTreeMap<String, String>),

    #[error("Internal server error")]
    Internal,
}

/// Build the canonical 401 response.
///
/// The body is `{success: false, message, errors: null}` and never says which
/// check failed.
pub fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(UNAUTHORIZED_MESSAGE, None)),
    )
        .into_response()
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            TaskError::InvalidToken(reason) => {
                tracing::debug!(target: "task.errors", reason = %reason, "Rejecting request with invalid token");
                return unauthorized_response();
            }
            TaskError::Unauthorized => return unauthorized_response(),
            TaskError::Database(detail) => {
                tracing::error!(target: "task.errors", error = %detail, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    None,
                )
            }
            TaskError::Crypto(detail) => {
                tracing::error!(target: "task.errors", error = %detail, "Cryptographic error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    None,
                )
            }
            TaskError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
                None,
            ),
            TaskError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                INVALID_CREDENTIALS_MESSAGE.to_string(),
                None,
            ),
            TaskError::Forbidden(message) => (StatusCode::FORBIDDEN, message, None),
            TaskError::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
            TaskError::Conflict(message) => (StatusCode::CONFLICT, message, None),
            TaskError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            TaskError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "Invalid request data".to_string(),
                serde_json::to_value(fields).ok(),
            ),
        };

        (status, Json(ApiResponse::<()>::error(message, errors))).into_response()
    }
}
