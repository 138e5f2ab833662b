//! Registration, login and logout.

use crate::auth::Identity;
use crate::errors::TaskError;
use crate::models::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest};
use crate::routes::AppState;
use crate::services::user_service;
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::instrument;

/// Deserialize a JSON body ourselves so malformed input is a 400 envelope
/// rather than axum's plain-text 422.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, TaskError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "task.handlers", error = %e, "Invalid request body");
        TaskError::BadRequest("Invalid request body".to_string())
    })
}

/// `POST /api/v1/auth/register`
#[instrument(skip_all, name = "task.auth.register")]
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), TaskError> {
    let request: RegisterRequest = parse_json(&body)?;

    let response = user_service::register(
        state.users.as_ref(),
        &state.codec,
        state.config.bcrypt_cost,
        request,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(response, "User registered successfully")),
    ))
}

/// `POST /api/v1/auth/login`
#[instrument(skip_all, name = "task.auth.login")]
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ApiResponse<AuthResponse>>, TaskError> {
    let request: LoginRequest = parse_json(&body)?;

    let response = user_service::login(
        state.users.as_ref(),
        &state.codec,
        &state.dummy_password_hash,
        request,
    )
    .await?;

    Ok(Json(ApiResponse::success(
        response,
        "User logged in successfully",
    )))
}

/// `POST /api/v1/auth/logout`
///
/// Tokens are stateless, so the client simply discards its token.
#[instrument(skip_all, name = "task.auth.logout")]
pub async fn logout(identity: Identity) -> Json<ApiResponse<()>> {
    tracing::info!(
        target: "task.handlers.auth",
        user_id = identity.subject_id(),
        "User logged out"
    );
    Json(ApiResponse::empty("User logged out successfully"))
}
