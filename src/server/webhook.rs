//! The webhook endpoint.
//!
//! Processing order: verify the signature, check the event type, parse the
//! payload, forward to the engine. A delivery that fails signature
//! verification is rejected before any of its bytes are interpreted.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use tracing::{debug, info, warn};

use crate::engine::EngineMessage;
use crate::webhooks::{parse_issue_comment, verify_signature};

use super::AppState;

/// Handles `POST /webhook`.
///
/// Returns 202 for everything the bridge accepts or deliberately ignores,
/// 401 for bad signatures, and 400 for deliveries it cannot interpret.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|value| value.to_str().ok());

    match signature {
        Some(signature) if verify_signature(&body, signature, state.webhook_secret()) => {}
        _ => {
            info!("webhook delivery rejected: missing or invalid signature");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let Some(event_type) = headers
        .get("x-github-event")
        .and_then(|value| value.to_str().ok())
    else {
        info!("webhook delivery rejected: missing event type header");
        return StatusCode::BAD_REQUEST;
    };

    if event_type != "issue_comment" {
        debug!(event_type, "ignoring unrelated webhook event");
        return StatusCode::ACCEPTED;
    }

    let seen = match parse_issue_comment(&body) {
        Ok(Some(seen)) => seen,
        Ok(None) => {
            debug!("ignoring issue_comment delivery with no PR comment");
            return StatusCode::ACCEPTED;
        }
        Err(err) => {
            warn!(error = %err, "could not parse issue_comment payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    info!(pr = %seen.pr, comment = %seen.comment_id, "forwarding PR comment to engine");

    if state
        .engine_tx()
        .send(EngineMessage::CommentSeen(seen))
        .await
        .is_err()
    {
        // Engine is gone; the process is shutting down.
        warn!("engine channel closed; dropping webhook delivery");
        return StatusCode::SERVICE_UNAVAILABLE;
    }

    StatusCode::ACCEPTED
}
