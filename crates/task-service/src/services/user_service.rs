//! Registration and login.
//!
//! Both return an [`AuthResponse`] carrying a freshly issued token.

use crate::crypto::{hash_password, verify_password, TokenCodec};
use crate::errors::TaskError;
use crate::models::{AuthResponse, LoginRequest, NewUser, RegisterRequest, User, UserResponse};
use crate::repositories::{UserRepository, DUPLICATE_EMAIL_MESSAGE};
use common::secret::{ExposeSecret, SecretString};
use tracing::instrument;

/// Register a new account and sign it in.
///
/// # Errors
///
/// - `Validation` - field errors in the request
/// - `BadRequest` - email already registered
#[instrument(skip_all, name = "task.service.register")]
pub async fn register(
    users: &dyn UserRepository,
    codec: &TokenCodec,
    bcrypt_cost: u32,
    request: RegisterRequest,
) -> Result<AuthResponse, TaskError> {
    request.validate()?;

    let password = request
        .password
        .ok_or_else(|| TaskError::BadRequest("Password cannot be blank".to_string()))?;
    let email = request.email.trim().to_string();

    if users.user_email_exists(&email).await? {
        tracing::debug!(target: "task.service.user", "Registration rejected: duplicate email");
        return Err(TaskError::BadRequest(DUPLICATE_EMAIL_MESSAGE.to_string()));
    }

    let password_hash = hash_in_background(password, bcrypt_cost).await?;

    let user = users
        .create_user(NewUser {
            name: request.name.trim().to_string(),
            email,
            password_hash,
        })
        .await?;

    tracing::info!(target: "task.service.user", user_id = user.id, "User registered");

    auth_response(codec, &user)
}

/// Authenticate by email and password.
///
/// Unknown email and wrong password fail identically, and both run a bcrypt
/// verification: an unknown email is checked against `dummy_hash`, which must
/// be hashed at the same cost as stored passwords.
#[instrument(skip_all, name = "task.service.login")]
pub async fn login(
    users: &dyn UserRepository,
    codec: &TokenCodec,
    dummy_hash: &str,
    request: LoginRequest,
) -> Result<AuthResponse, TaskError> {
    request.validate()?;

    let password = request.password.ok_or(TaskError::InvalidCredentials)?;
    let user = users.find_user_by_email(request.email.trim()).await?;

    let hash = user
        .as_ref()
        .map_or_else(|| dummy_hash.to_string(), |u| u.password_hash.clone());
    let verified = verify_in_background(password, hash).await;

    let user = match (user, verified) {
        (Some(user), Ok(true)) => user,
        (Some(_), Err(e)) => return Err(e),
        _ => {
            tracing::info!(target: "task.service.user", "Login failed");
            return Err(TaskError::InvalidCredentials);
        }
    };

    tracing::info!(target: "task.service.user", user_id = user.id, "User logged in");

    auth_response(codec, &user)
}

fn auth_response(codec: &TokenCodec, user: &User) -> Result<AuthResponse, TaskError> {
    Ok(AuthResponse {
        access_token: codec.issue(&user.id.to_string())?,
        token_type: "Bearer".to_string(),
        expires_in: codec.ttl_seconds(),
        user: UserResponse::from(user),
    })
}

/// bcrypt is CPU-bound; keep it off the async workers.
pub(crate) async fn hash_in_background(
    password: SecretString,
    cost: u32,
) -> Result<String, TaskError> {
    tokio::task::spawn_blocking(move || hash_password(password.expose_secret(), cost))
        .await
        .map_err(|e| TaskError::Crypto(format!("Password hashing task failed: {}", e)))?
}

async fn verify_in_background(password: SecretString, hash: String) -> Result<bool, TaskError> {
    tokio::task::spawn_blocking(move || verify_password(password.expose_secret(), &hash))
        .await
        .map_err(|e| TaskError::Crypto(format!("Password verification task failed: {}", e)))?
}
