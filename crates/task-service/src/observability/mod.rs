//! Observability for the task service.
//!
//! All instrumentation uses `#[instrument(skip_all)]` with explicitly chosen
//! fields. Tokens, passwords and signing keys never appear in spans or
//! events; user ids appear only as numeric identifiers.

pub mod metrics;
