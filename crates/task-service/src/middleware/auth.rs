//! Authentication gate for inbound requests.
//!
//! [`AuthenticationGate::evaluate`] turns a request's headers into a
//! [`GateOutcome`]. Two middleware consume it:
//! - `authenticate` - lenient; attaches an identity when one is proven and
//!   otherwise lets the request through anonymously
//! - `require_identity` - strict; anything but a proven identity is answered
//!   with the canonical 401 and the handler never runs
//!
//! The resolved [`Identity`] is stored in request extensions at most once.

use crate::auth::{CredentialStore, Identity};
use crate::crypto::TokenCodec;
use crate::errors::unauthorized_response;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Why the gate refused to establish an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Malformed, forged, expired or otherwise unverifiable token.
    InvalidToken,
    /// The credential store failed while resolving the subject.
    ResolutionFailed,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::InvalidToken => "invalid_token",
            RejectReason::ResolutionFailed => "resolution_failed",
        }
    }
}

/// Result of evaluating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Continue, with the identity if one was established.
    Proceed(Option<Identity>),
    /// A bearer credential was presented and could not be trusted.
    Reject(RejectReason),
}

/// Verifies bearer tokens and resolves their subject.
pub struct AuthenticationGate {
    codec: Arc<TokenCodec>,
    store: Arc<dyn CredentialStore>,
}

impl AuthenticationGate {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn CredentialStore>) -> Self {
        Self { codec, store }
    }

    /// Decide whether the request carries a usable identity.
    ///
    /// An identity that is already attached is returned unchanged without
    /// looking at the headers again.
    pub async fn evaluate(
        &self,
        headers: &HeaderMap,
        already_attached: Option<Identity>,
    ) -> GateOutcome {
        if let Some(identity) = already_attached {
            return GateOutcome::Proceed(Some(identity));
        }

        let Some(token) = extract_bearer_token(headers) else {
            return GateOutcome::Proceed(None);
        };

        let subject = match self.codec.verify(token) {
            Ok(subject) => subject,
            Err(_) => return GateOutcome::Reject(RejectReason::InvalidToken),
        };

        let Ok(subject_id) = subject.parse::<i64>() else {
            tracing::debug!(target: "task.middleware.auth", "Token subject is not a user id");
            return GateOutcome::Reject(RejectReason::InvalidToken);
        };

        match self.store.resolve(subject_id).await {
            Ok(Some(identity)) => GateOutcome::Proceed(Some(identity)),
            Ok(None) => {
                tracing::debug!(
                    target: "task.middleware.auth",
                    user_id = subject_id,
                    "Token subject no longer exists"
                );
                GateOutcome::Proceed(None)
            }
            Err(e) => {
                tracing::warn!(
                    target: "task.middleware.auth",
                    error = %e,
                    "Identity resolution failed"
                );
                GateOutcome::Reject(RejectReason::ResolutionFailed)
            }
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
///
/// Missing headers, non-UTF-8 values and other schemes yield `None`.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Lenient gate for public routes.
///
/// Attaches the identity when one is established. A rejected token is
/// logged and the request continues anonymously.
#[instrument(skip_all, name = "task.middleware.authenticate")]
pub async fn authenticate(
    State(gate): State<Arc<AuthenticationGate>>,
    mut req: Request,
    next: Next,
) -> Response {
    let attached = req.extensions().get::<Identity>().copied();

    match gate.evaluate(req.headers(), attached).await {
        GateOutcome::Proceed(Some(identity)) if attached.is_none() => {
            req.extensions_mut().insert(identity);
        }
        GateOutcome::Proceed(_) => {}
        GateOutcome::Reject(reason) => {
            tracing::debug!(
                target: "task.middleware.auth",
                reason = reason.as_str(),
                "Continuing anonymously after rejected credential"
            );
        }
    }

    next.run(req).await
}

/// Strict gate for protected routes.
///
/// Only a proven identity reaches the handler; everything else gets the
/// canonical 401.
#[instrument(skip_all, name = "task.middleware.require_identity")]
pub async fn require_identity(
    State(gate): State<Arc<AuthenticationGate>>,
    mut req: Request,
    next: Next,
) -> Response {
    let attached = req.extensions().get::<Identity>().copied();

    match gate.evaluate(req.headers(), attached).await {
        GateOutcome::Proceed(Some(identity)) => {
            if attached.is_none() {
                req.extensions_mut().insert(identity);
            }
            next.run(req).await
        }
        GateOutcome::Proceed(None) => {
            tracing::debug!(target: "task.middleware.auth", "Anonymous request to protected route");
            unauthorized_response()
        }
        GateOutcome::Reject(reason) => {
            tracing::debug!(
                target: "task.middleware.auth",
                reason = reason.as_str(),
                "Rejecting request"
            );
            unauthorized_response()
        }
    }
}
