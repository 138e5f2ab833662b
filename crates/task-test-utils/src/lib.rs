//! # Task Test Utilities
//!
//! Shared test utilities for the task service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed signing secrets)
//! - Token builders (valid, expired, forged and downgraded tokens)
//! - Server test harness (TestTaskServer for E2E tests)
//! - Envelope assertions (EnvelopeAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use task_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestTaskServer::spawn().await?;
//!     let alice = server.register_user("Alice", "alice@example.com").await?;
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/tasks", server.url()))
//!         .bearer_auth(&alice.token)
//!         .send()
//!         .await?;
//!
//!     response.json::<serde_json::Value>().await?.assert_success();
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
