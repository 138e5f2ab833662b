//! Middleware for the task service.
//!
//! # Components
//!
//! - `auth` - Authentication gate (lenient and strict variants)
//! - `http_metrics` - HTTP request metrics

pub mod auth;
pub mod http_metrics;

pub use auth::{authenticate, require_identity, AuthenticationGate, GateOutcome, RejectReason};
pub use http_metrics::http_metrics_middleware;
