//! JWT utilities shared across task tracker crates.
//!
//! This module provides common JWT primitives including:
//! - Size limits for DoS prevention
//! - A pre-parse structural check for compact tokens
//! - The identity token claim set
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Generic error messages prevent information leakage
//! - The `sub` field in [`TokenClaims`] is redacted in Debug output

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected BEFORE any base64 decoding or
/// signature verification. A typical identity token is ~200 bytes.
///
/// Per OWASP API Security Top 10 - API4:2023 (Unrestricted Resource Consumption)
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Registered claim names owned by the token issuer.
///
/// Extra claims supplied by callers may never shadow these.
pub const RESERVED_CLAIMS: &[&str] = &["sub", "iat", "exp"];

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the pre-parse structural check.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid compact JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,
}

// =============================================================================
// Claims Types
// =============================================================================

/// Identity token claims.
///
/// - `sub`: Subject (user identifier, decimal string)
/// - `iat`: Issued-at timestamp (Unix epoch seconds)
/// - `exp`: Expiration timestamp (Unix epoch seconds)
/// - `extra`: Additional caller-supplied claims, flattened into the payload
///
/// # Security
///
/// The `sub` field is redacted in Debug output to prevent accidental logging
/// of user identifiers.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user identifier) - redacted in Debug output.
    pub sub: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Additional claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TokenClaims {
    /// Creates a claim set with no extra claims.
    #[must_use]
    pub fn new(sub: String, iat: i64, exp: i64) -> Self {
        Self {
            sub,
            iat,
            exp,
            extra: Map::new(),
        }
    }

    /// Attach extra claims, dropping any that collide with [`RESERVED_CLAIMS`].
    #[must_use]
    pub fn with_extra(mut self, mut extra: Map<String, Value>) -> Self {
        for reserved in RESERVED_CLAIMS {
            if extra.remove(*reserved).is_some() {
                tracing::debug!(
                    target: "common.jwt",
                    claim = *reserved,
                    "Dropped extra claim shadowing a reserved claim"
                );
            }
        }
        self.extra = extra;
        self
    }

    /// Whether the token is expired at `now`.
    ///
    /// The boundary is inclusive: a token is rejected once `now >= exp`.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Cheap structural check run before any decoding or cryptography.
///
/// Rejects tokens that exceed [`MAX_JWT_SIZE_BYTES`] or that are not made of
/// exactly three non-empty-header dot-separated segments.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds size limit (denial-of-service protection)
/// - `MalformedToken` - Token is not in compact `header.payload.signature` form
pub fn check_token_shape(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.first().is_some_and(|h| h.is_empty()) {
        tracing::debug!(
            target: "common.jwt",
            parts = segments.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
