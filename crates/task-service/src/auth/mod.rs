//! Authenticated principal and the store that vouches for it.
//!
//! An [`Identity`] is built by the authentication gate for a single request
//! and handed to handlers explicitly, either through the [`Identity`]
//! extractor or as an `Option<Identity>` on lenient routes.

pub mod ownership;

pub use ownership::{ensure_owner, TaskAction};

use crate::errors::TaskError;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::fmt;

/// The authenticated principal for one request.
///
/// Carries only the numeric user id; there are no roles or scopes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    subject_id: i64,
}

impl Identity {
    pub const fn new(subject_id: i64) -> Self {
        Self { subject_id }
    }

    pub const fn subject_id(&self) -> i64 {
        self.subject_id
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject_id", &"[REDACTED]")
            .finish()
    }
}

/// Resolves a verified token subject to a live account.
///
/// `Ok(None)` means the account no longer exists; the request then
/// continues anonymously.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn resolve(&self, subject_id: i64) -> Result<Option<Identity>, TaskError>;
}

/// Handlers that declare `Identity` reject anonymous requests with the
/// canonical 401 before their body runs.
#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = TaskError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Identity>().copied().ok_or_else(|| {
            tracing::debug!(target: "task.auth", "No identity attached to request");
            TaskError::Unauthorized
        })
    }
}
