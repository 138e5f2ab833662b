//! Common utilities and types shared across task tracker crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size guard, identity claims)
pub mod jwt;
