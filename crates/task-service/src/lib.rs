//! Task Tracker Service Library
//!
//! Multi-tenant task tracking behind stateless bearer-token authentication.
//!
//! # Modules
//!
//! - `auth` - Authenticated identity and the ownership guard
//! - `config` - Service configuration
//! - `crypto` - Token codec and password hashing
//! - `errors` - Error types and the unauthorized responder
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication gate and HTTP metrics
//! - `models` - Data models and the response envelope
//! - `observability` - Metrics
//! - `repositories` - Storage layer (PostgreSQL and in-memory)
//! - `routes` - Router assembly
//! - `services` - Business logic layer

pub mod auth;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
