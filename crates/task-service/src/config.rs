use base64::{engine::general_purpose, Engine as _};
use common::secret::{duplicate_bytes, secret_bytes, SecretBox};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Minimum decoded length of the token signing secret (256 bits, HS256).
pub const MIN_SECRET_KEY_BYTES: usize = 32;

/// Default bcrypt cost factor for password hashing.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum allowed bcrypt cost factor.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum allowed bcrypt cost factor.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

pub struct Config {
    /// Postgres connection string. `None` selects in-memory storage.
    pub database_url: Option<String>,
    pub bind_address: String,
    /// Decoded symmetric secret used to sign and verify identity tokens.
    pub jwt_secret: SecretBox<Vec<u8>>,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub seed_demo_data: bool,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            database_url: self.database_url.clone(),
            bind_address: self.bind_address.clone(),
            jwt_secret: duplicate_bytes(&self.jwt_secret),
            token_ttl: self.token_ttl,
            bcrypt_cost: self.bcrypt_cost,
            seed_demo_data: self.seed_demo_data,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("bind_address", &self.bind_address)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("seed_demo_data", &self.seed_demo_data)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT secret key: {0}")]
    InvalidSecretKey(String),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Invalid token TTL: {0}")]
    InvalidTokenTtl(String),

    #[error("Invalid bcrypt cost: {0}")]
    InvalidBcryptCost(String),

    #[error("Invalid boolean flag {name}: {value}")]
    InvalidFlag { name: String, value: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .cloned();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let secret_base64 = vars
            .get("JWT_SECRET_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET_KEY".to_string()))?;

        let jwt_secret = general_purpose::STANDARD
            .decode(secret_base64.trim())
            .map_err(ConfigError::Base64Error)?;

        if jwt_secret.len() < MIN_SECRET_KEY_BYTES {
            return Err(ConfigError::InvalidSecretKey(format!(
                "Expected at least {} bytes, got {}",
                MIN_SECRET_KEY_BYTES,
                jwt_secret.len()
            )));
        }

        let ttl_raw = vars
            .get("JWT_EXPIRATION_SECONDS")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_EXPIRATION_SECONDS".to_string()))?;

        let ttl_seconds: u64 = ttl_raw.trim().parse().map_err(|e| {
            ConfigError::InvalidTokenTtl(format!("JWT_EXPIRATION_SECONDS must be an integer: {}", e))
        })?;

        if ttl_seconds == 0 {
            return Err(ConfigError::InvalidTokenTtl(
                "JWT_EXPIRATION_SECONDS must be greater than zero".to_string(),
            ));
        }

        let bcrypt_cost = match vars.get("BCRYPT_COST") {
            Some(raw) => {
                let cost: u32 = raw.trim().parse().map_err(|e| {
                    ConfigError::InvalidBcryptCost(format!("BCRYPT_COST must be an integer: {}", e))
                })?;
                if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
                    return Err(ConfigError::InvalidBcryptCost(format!(
                        "Expected {}-{}, got {}",
                        MIN_BCRYPT_COST, MAX_BCRYPT_COST, cost
                    )));
                }
                cost
            }
            None => DEFAULT_BCRYPT_COST,
        };

        let seed_demo_data = match vars.get("SEED_DEMO_DATA") {
            Some(raw) => parse_flag("SEED_DEMO_DATA", raw)?,
            None => false,
        };

        Ok(Config {
            database_url,
            bind_address,
            jwt_secret: secret_bytes(jwt_secret),
            token_ttl: Duration::from_secs(ttl_seconds),
            bcrypt_cost,
            seed_demo_data,
        })
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}
