//! Engine message types for async communication.
//!
//! The trigger watchers (poller or webhook) and the build watcher all feed
//! the same `tokio::sync::mpsc` channel, and one runtime task drains it.
//! Serial processing on a single task is what makes each cache step atomic
//! with respect to the others; there is no other synchronisation.

use crate::types::{CommentId, ObservedBuild, PrNumber};

use super::BuildTrigger;

/// A freshly created PR comment reported by the webhook listener.
///
/// The listener has already checked the payload shape (a `created` issue
/// comment attached to a pull request); the runtime decides whether it
/// actually triggers a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSeen {
    /// The pull request the comment was posted on.
    pub pr: PrNumber,

    /// The comment ID, for log lines.
    pub comment_id: CommentId,

    /// The comment author's login.
    pub author: String,

    /// The comment body.
    pub body: String,
}

/// Messages processed by the engine runtime.
#[derive(Debug)]
pub enum EngineMessage {
    /// A fully evaluated trigger from the polling watcher.
    ///
    /// The poller has already fetched the discussion and applied the
    /// trigger evaluator; the runtime hands this straight to the engine.
    Trigger(BuildTrigger),

    /// A new PR comment from the webhook listener, not yet evaluated.
    CommentSeen(CommentSeen),

    /// A completed build from the build watcher.
    BuildObserved(ObservedBuild),

    /// Request a graceful shutdown.
    ///
    /// The runtime finishes the current message and exits its loop.
    Shutdown,
}
