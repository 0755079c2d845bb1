//! HTTP server for the bridge.
//!
//! The server is the push-mode trigger source: it accepts GitHub webhook
//! deliveries, verifies their signatures, and forwards freshly created PR
//! comments to the engine's message channel. It never talks to GitHub or
//! Buildbot itself.
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts GitHub webhook deliveries (returns 202 Accepted)
//! - `GET /health` - Returns 200 if the server is running

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::EngineMessage;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

/// Shared application state, passed to handlers via Axum's `State`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Webhook secret for HMAC-SHA256 signature verification.
    webhook_secret: Vec<u8>,

    /// Sender side of the engine's message channel.
    engine_tx: mpsc::Sender<EngineMessage>,
}

impl AppState {
    /// Creates a new `AppState`.
    pub fn new(webhook_secret: impl Into<Vec<u8>>, engine_tx: mpsc::Sender<EngineMessage>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                webhook_secret: webhook_secret.into(),
                engine_tx,
            }),
        }
    }

    /// Returns the webhook secret.
    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }

    /// Returns the engine message sender.
    pub fn engine_tx(&self) -> &mpsc::Sender<EngineMessage> {
        &self.inner.engine_tx
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
