//! Builder patterns for test tokens
//!
//! Mints tokens directly with `jsonwebtoken` so tests can produce shapes the
//! service's own codec never would: expired, wrongly signed, downgraded or
//! unsigned.

use crate::crypto_fixtures::test_jwt_secret;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for signed test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject("42")
///     .expired_seconds_ago(60)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: Option<String>,
    iat: i64,
    exp: Option<i64>,
    extra: Map<String, Value>,
    secret: Vec<u8>,
    algorithm: Algorithm,
}

impl TestTokenBuilder {
    /// Create a builder with defaults: HS256, default test secret, 1h lifetime.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: Some("test-subject".to_string()),
            iat: now.timestamp(),
            exp: Some((now + Duration::seconds(3600)).timestamp()),
            extra: Map::new(),
            secret: test_jwt_secret(),
            algorithm: Algorithm::HS256,
        }
    }

    /// Set the subject
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Subject as a user id
    pub fn for_user_id(self, user_id: i64) -> Self {
        self.for_subject(&user_id.to_string())
    }

    /// Omit the `sub` claim entirely
    pub fn without_subject(mut self) -> Self {
        self.sub = None;
        self
    }

    /// Set expiration in seconds from now
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Expired `seconds` ago, issued an hour before that
    pub fn expired_seconds_ago(mut self, seconds: i64) -> Self {
        let exp = Utc::now().timestamp() - seconds;
        self.exp = Some(exp);
        self.iat = exp - 3600;
        self
    }

    /// Omit the `exp` claim entirely
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Add an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Sign with a different secret
    pub fn signed_with(mut self, secret: &[u8]) -> Self {
        self.secret = secret.to_vec();
        self
    }

    /// Sign with a different HMAC algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The claims as a JSON value
    pub fn claims(&self) -> Value {
        let mut claims = self.extra.clone();
        if let Some(sub) = &self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        claims.insert("iat".to_string(), json!(self.iat));
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        Value::Object(claims)
    }

    /// Sign and serialize the token
    pub fn build(self) -> String {
        let claims = self.claims();
        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .expect("HMAC signing with a test secret cannot fail")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Token with `"alg":"none"` and an empty signature segment.
pub fn unsigned_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.")
}

/// Replace the payload while keeping the original header and signature.
pub fn with_swapped_payload(token: &str, claims: &Value) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "expected a three-segment token");
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.{}", parts[0], payload, parts[2])
}

/// Flip the last character of the signature segment.
pub fn with_corrupted_signature(token: &str) -> String {
    let mut chars: Vec<char> = token.chars().collect();
    let last = chars.last_mut().expect("token must not be empty");
    *last = if *last == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}
