//! Deterministic signing secrets for testing
//!
//! The same seed always produces the same secret, so tokens minted in a test
//! can be reproduced byte-for-byte.

use base64::engine::general_purpose;
use base64::Engine;
use common::secret::{secret_bytes, SecretBox};

/// Length of the default test secret (selects HS256).
pub const TEST_SECRET_LEN: usize = 32;

/// Generate a deterministic signing secret of `len` bytes.
///
/// # Example
/// ```rust,ignore
/// let secret = test_secret(1, 64); // selects HS512
/// assert_eq!(secret, test_secret(1, 64));
/// ```
pub fn test_secret(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| seed.wrapping_mul(31).wrapping_add(i as u8).wrapping_mul(7))
        .collect()
}

/// Default test secret, as raw bytes.
pub fn test_jwt_secret() -> Vec<u8> {
    test_secret(1, TEST_SECRET_LEN)
}

/// Default test secret wrapped the way `Config` holds it.
pub fn test_jwt_secret_box() -> SecretBox<Vec<u8>> {
    secret_bytes(test_jwt_secret())
}

/// Standard base64 encoding, as expected by `JWT_SECRET_KEY`.
pub fn encode_secret(secret: &[u8]) -> String {
    general_purpose::STANDARD.encode(secret)
}
