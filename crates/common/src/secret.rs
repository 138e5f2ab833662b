//! Wrappers for values that must never reach a log line.
//!
//! Passwords travel as [`SecretString`] from the request body to the bcrypt
//! call. The HMAC signing secret lives in a [`SecretBox<Vec<u8>>`] for the
//! life of the process. Both print `[REDACTED]` under `{:?}` and zeroize on
//! drop; reading the value needs an explicit `expose_secret()`.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug, serde::Deserialize)]
//! struct Login {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let login: Login =
//!     serde_json::from_str(r#"{"email":"a@example.com","password":"hunter2"}"#).unwrap();
//! assert!(!format!("{login:?}").contains("hunter2"));
//! assert_eq!(login.password.expose_secret(), "hunter2");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

/// Wrap raw key material.
pub fn secret_bytes(bytes: Vec<u8>) -> SecretBox<Vec<u8>> {
    SecretBox::new(Box::new(bytes))
}

/// Duplicate key material into a fresh box.
///
/// `SecretBox` is not `Clone`; cloned configuration copies its key through
/// here so the copy is zeroized as well.
pub fn duplicate_bytes(secret: &SecretBox<Vec<u8>>) -> SecretBox<Vec<u8>> {
    secret_bytes(secret.expose_secret().clone())
}
