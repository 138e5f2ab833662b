use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST, MIN_SECRET_KEY_BYTES};
use crate::errors::TaskError;
use crate::observability::metrics::{record_token_issuance, record_token_validation};
use common::jwt::{check_token_shape, JwtValidationError, TokenClaims};
use common::secret::{ExposeSecret, SecretBox};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// Generic message for every token verification failure.
const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// Length of the random password behind [`dummy_password_hash`].
const DUMMY_PASSWORD_LEN: usize = 32;

/// Pick the strongest HMAC algorithm the key length supports.
///
/// Returns `None` for keys shorter than [`MIN_SECRET_KEY_BYTES`].
pub fn algorithm_for_key_len(len: usize) -> Option<Algorithm> {
    match len {
        n if n >= 64 => Some(Algorithm::HS512),
        n if n >= 48 => Some(Algorithm::HS384),
        n if n >= MIN_SECRET_KEY_BYTES => Some(Algorithm::HS256),
        _ => None,
    }
}

/// Issues and verifies signed, time-bounded identity tokens.
///
/// Holds only the process-wide signing key and TTL. Immutable after
/// construction, so one instance is shared behind an `Arc` by every request.
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("keys", &"[REDACTED]")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenCodec {
    /// Build a codec from the decoded secret and token lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Crypto` if the key is too short for any supported
    /// algorithm or the TTL is zero or does not fit in an `i64`.
    pub fn new(secret: &SecretBox<Vec<u8>>, ttl: Duration) -> Result<Self, TaskError> {
        let key = secret.expose_secret();

        let algorithm = algorithm_for_key_len(key.len()).ok_or_else(|| {
            TaskError::Crypto(format!(
                "Signing key must be at least {} bytes, got {}",
                MIN_SECRET_KEY_BYTES,
                key.len()
            ))
        })?;

        let ttl_seconds = i64::try_from(ttl.as_secs())
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| TaskError::Crypto("Token TTL must be positive".to_string()))?;

        tracing::debug!(target: "task.crypto", algorithm = ?algorithm, ttl_seconds, "Token codec initialized");

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            ttl_seconds,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Token lifetime in seconds.
    pub fn ttl_seconds(&self) -> u64 {
        u64::try_from(self.ttl_seconds).unwrap_or(0)
    }

    /// Issue a token for `subject` using the wall clock.
    pub fn issue(&self, subject: &str) -> Result<String, TaskError> {
        self.issue_at(subject, chrono::Utc::now().timestamp())
    }

    /// Issue a token whose claims are exactly `{sub, iat: now, exp: now + ttl}`.
    pub fn issue_at(&self, subject: &str, now: i64) -> Result<String, TaskError> {
        self.issue_with_claims_at(subject, Map::new(), now)
    }

    /// Issue a token carrying additional claims.
    ///
    /// Extra entries named `sub`, `iat` or `exp` are dropped.
    #[instrument(skip_all, name = "task.crypto.issue")]
    pub fn issue_with_claims_at(
        &self,
        subject: &str,
        extra: Map<String, Value>,
        now: i64,
    ) -> Result<String, TaskError> {
        let exp = now.checked_add(self.ttl_seconds).ok_or_else(|| {
            record_token_issuance("error");
            TaskError::Crypto("Token expiry overflows".to_string())
        })?;

        let claims = TokenClaims::new(subject.to_string(), now, exp).with_extra(extra);

        let mut header = Header::new(self.algorithm);
        header.typ = Some("JWT".to_string());

        let token = encode(&header, &claims, &self.encoding_key).map_err(|e| {
            record_token_issuance("error");
            TaskError::Crypto(format!("JWT signing operation failed: {}", e))
        })?;

        record_token_issuance("success");
        Ok(token)
    }

    /// Verify `token` against the wall clock and return its subject.
    pub fn verify(&self, token: &str) -> Result<String, TaskError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify `token` as of `now` and return its subject.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<String, TaskError> {
        self.decode_claims_at(token, now).map(|claims| claims.sub)
    }

    /// Verify `token` as of `now` and return the full claim set.
    ///
    /// Runs in a fixed order: size/shape guard, then signature and algorithm,
    /// then expiry. Expiry is only read from claims whose signature passed.
    /// Every failure collapses to `TaskError::InvalidToken`.
    #[instrument(skip_all, name = "task.crypto.verify")]
    pub fn decode_claims_at(&self, token: &str, now: i64) -> Result<TokenClaims, TaskError> {
        check_token_shape(token).map_err(|e| {
            let category = match e {
                JwtValidationError::TokenTooLarge => "size",
                JwtValidationError::MalformedToken => "malformed",
            };
            invalid_token(category)
        })?;

        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data =
            decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(target: "task.crypto", error = %e, "Token verification failed");
                let category = match e.kind() {
                    ErrorKind::InvalidSignature => "signature",
                    ErrorKind::InvalidAlgorithm => "algorithm",
                    _ => "malformed",
                };
                invalid_token(category)
            })?;

        if token_data.claims.is_expired_at(now) {
            tracing::debug!(
                target: "task.crypto",
                exp = token_data.claims.exp,
                now,
                "Token rejected: expired"
            );
            return Err(invalid_token("expired"));
        }

        record_token_validation("success", None);
        Ok(token_data.claims)
    }
}

fn invalid_token(category: &str) -> TaskError {
    record_token_validation("error", Some(category));
    TaskError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
}

/// Hash a password with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, TaskError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(TaskError::Crypto(format!(
            "Invalid bcrypt cost: {} (must be {}-{})",
            cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
        )));
    }

    bcrypt::hash(password, cost)
        .map_err(|e| TaskError::Crypto(format!("Password hashing failed: {}", e)))
}

/// Bcrypt hash of a random password at `cost`.
///
/// Verified when a login names an unknown email. It must share the cost of
/// stored hashes so both failure paths take the same time.
pub fn dummy_password_hash(cost: u32) -> Result<String, TaskError> {
    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DUMMY_PASSWORD_LEN)
        .map(char::from)
        .collect();

    hash_password(&password, cost)
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, TaskError> {
    bcrypt::verify(password, hash)
        .map_err(|e| TaskError::Crypto(format!("Password verification failed: {}", e)))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use serde_json::json;

    const T0: i64 = 1_700_000_000;
    const DAY: u64 = 86_400;

    fn secret(len: usize) -> SecretBox<Vec<u8>> {
        SecretBox::new(Box::new((0..len).map(|i| (i * 7 % 251) as u8).collect()))
    }

    fn codec() -> TokenCodec {
        TokenCodec::new(&secret(32), Duration::from_secs(DAY)).unwrap()
    }

    fn assert_invalid(result: Result<String, TaskError>) {
        match result {
            Err(TaskError::InvalidToken(msg)) => assert_eq!(msg, INVALID_TOKEN_MESSAGE),
            other => panic!("Expected InvalidToken, got {:?}", other),
        }
    }

    #[test]
    fn test_algorithm_selected_from_key_length() {
        assert_eq!(algorithm_for_key_len(31), None);
        assert_eq!(algorithm_for_key_len(32), Some(Algorithm::HS256));
        assert_eq!(algorithm_for_key_len(47), Some(Algorithm::HS256));
        assert_eq!(algorithm_for_key_len(48), Some(Algorithm::HS384));
        assert_eq!(algorithm_for_key_len(64), Some(Algorithm::HS512));
        assert_eq!(algorithm_for_key_len(128), Some(Algorithm::HS512));
    }

    #[test]
    fn test_new_rejects_short_key() {
        let result = TokenCodec::new(&secret(16), Duration::from_secs(60));
        assert!(matches!(result, Err(TaskError::Crypto(_))));
    }

    #[test]
    fn test_new_rejects_zero_ttl() {
        let result = TokenCodec::new(&secret(32), Duration::ZERO);
        assert!(matches!(result, Err(TaskError::Crypto(_))));
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let codec = codec();
        let token = codec.issue_at("42", T0).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(codec.verify_at(&token, T0).unwrap(), "42");
    }

    #[test]
    fn test_issue_and_verify_with_wall_clock() {
        let codec = codec();
        let token = codec.issue("7").unwrap();
        assert_eq!(codec.verify(&token).unwrap(), "7");
    }

    #[test]
    fn test_claims_are_exactly_sub_iat_exp() {
        let codec = codec();
        let token = codec.issue_at("42", T0).unwrap();

        let payload = token.split('.').nth(1).unwrap();
        let value: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"sub": "42", "iat": T0, "exp": T0 + DAY as i64})
        );
    }

    #[test]
    fn test_verify_within_ttl_and_after_expiry() {
        let codec = codec();
        let token = codec.issue_at("42", T0).unwrap();

        assert_eq!(codec.verify_at(&token, T0 + 1000).unwrap(), "42");
        assert_invalid(codec.verify_at(&token, T0 + 86_401));
    }

    #[test]
    fn test_expiry_boundary_rejects_at_exp() {
        let codec = codec();
        let token = codec.issue_at("42", T0).unwrap();
        let exp = T0 + DAY as i64;

        assert!(codec.verify_at(&token, exp - 1).is_ok());
        assert_invalid(codec.verify_at(&token, exp));
    }

    #[test]
    fn test_signature_mutation_rejected() {
        let codec = codec();
        let token = codec.issue_at("42", T0).unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            let original = *bytes.get(i).unwrap();
            *bytes.get_mut(i).unwrap() = if original == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(bytes).unwrap();

            assert_invalid(codec.verify_at(&mutated, T0));
        }
    }

    #[test]
    fn test_payload_tampering_rejected() {
        let codec = codec();
        let token = codec.issue_at("42", T0).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_payload = URL_SAFE_NO_PAD.encode(
            json!({"sub": "1", "iat": T0, "exp": T0 + 10 * DAY as i64}).to_string(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_invalid(codec.verify_at(&forged, T0));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let issuer = TokenCodec::new(
            &SecretBox::new(Box::new(vec![9u8; 32])),
            Duration::from_secs(DAY),
        )
        .unwrap();
        let token = issuer.issue_at("42", T0).unwrap();

        assert_invalid(codec().verify_at(&token, T0));
    }

    #[test]
    fn test_other_hmac_algorithm_rejected() {
        let key = secret(32);
        let claims = TokenClaims::new("42".to_string(), T0, T0 + 60);
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(key.expose_secret()),
        )
        .unwrap();

        assert_invalid(codec().verify_at(&token, T0));
    }

    #[test]
    fn test_unsigned_token_rejected() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(json!({"sub": "42", "iat": T0, "exp": T0 + 60}).to_string());

        assert_invalid(codec().verify_at(&format!("{header}.{payload}."), T0));
    }

    #[test]
    fn test_malformed_and_oversized_tokens_rejected() {
        let codec = codec();
        assert_invalid(codec.verify_at("", T0));
        assert_invalid(codec.verify_at("not-a-token", T0));
        assert_invalid(codec.verify_at("a.b.c", T0));

        let oversized = format!("{}.{}.{}", "a".repeat(4000), "b".repeat(4000), "c".repeat(400));
        assert_invalid(codec.verify_at(&oversized, T0));
    }

    #[test]
    fn test_missing_exp_rejected() {
        let key = secret(32);
        let token = encode(
            &Header::new(Algorithm::HS256),
            &json!({"sub": "42", "iat": T0}),
            &EncodingKey::from_secret(key.expose_secret()),
        )
        .unwrap();

        assert_invalid(codec().verify_at(&token, T0));
    }

    #[test]
    fn test_extra_claims_round_trip_without_overriding_reserved() {
        let codec = codec();
        let extra = json!({"tenant": "acme", "sub": "999", "exp": 1})
            .as_object()
            .cloned()
            .unwrap();
        let token = codec.issue_with_claims_at("42", extra, T0).unwrap();

        let claims = codec.decode_claims_at(&token, T0 + 5).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.exp, T0 + DAY as i64);
        assert_eq!(claims.extra.get("tenant"), Some(&json!("acme")));
    }

    #[test]
    fn test_long_key_uses_hs512() {
        let codec = TokenCodec::new(&secret(64), Duration::from_secs(60)).unwrap();
        assert_eq!(codec.algorithm(), Algorithm::HS512);

        let token = codec.issue_at("5", T0).unwrap();
        let header: Value = serde_json::from_slice(
            &URL_SAFE_NO_PAD
                .decode(token.split('.').next().unwrap())
                .unwrap(),
        )
        .unwrap();
        assert_eq!(header["alg"], "HS512");
        assert_eq!(codec.verify_at(&token, T0 + 59).unwrap(), "5");
    }

    #[test]
    fn test_debug_redacts_keys() {
        let debug = format!("{:?}", codec());
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("HS256"));
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("secret123", MIN_BCRYPT_COST).unwrap();

        assert!(hash.starts_with("$2b$10$"));
        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_hash_password_rejects_cost_out_of_range() {
        assert!(matches!(
            hash_password("secret123", 4),
            Err(TaskError::Crypto(_))
        ));
        assert!(matches!(
            hash_password("secret123", 15),
            Err(TaskError::Crypto(_))
        ));
    }

    #[test]
    fn test_dummy_hash_verifies_as_mismatch() {
        let hash = dummy_password_hash(MIN_BCRYPT_COST).unwrap();

        assert!(matches!(verify_password("anything", &hash), Ok(false)));
    }

    #[test]
    fn test_dummy_hash_uses_requested_cost() {
        let at_min = dummy_password_hash(MIN_BCRYPT_COST).unwrap();
        let at_eleven = dummy_password_hash(11).unwrap();

        assert!(at_min.starts_with(&format!("$2b${:02}$", MIN_BCRYPT_COST)));
        assert!(at_eleven.starts_with("$2b$11$"));
        assert_ne!(at_min, dummy_password_hash(MIN_BCRYPT_COST).unwrap());
    }

    #[test]
    fn test_dummy_hash_rejects_out_of_range_cost() {
        assert!(matches!(dummy_password_hash(4), Err(TaskError::Crypto(_))));
    }
}
