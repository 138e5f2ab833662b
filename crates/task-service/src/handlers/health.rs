//! Operational endpoints.

use crate::errors::TaskError;
use axum::extract::State;
use axum::http::{Method, Uri};
use metrics_exporter_prometheus::PrometheusHandle;

/// Liveness probe. Does not check dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Prometheus text exposition.
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// Envelope 404 for unrouted paths.
pub async fn not_found(method: Method, uri: Uri) -> TaskError {
    TaskError::NotFound(format!(
        "The requested endpoint '{} {}' was not found",
        method,
        uri.path()
    ))
}
