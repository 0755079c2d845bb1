//! The health check endpoint.

/// Handles `GET /health`. Liveness only; no dependencies are probed.
pub async fn health_handler() -> &'static str {
    "OK"
}
