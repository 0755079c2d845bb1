//! Trigger evaluation over a pull request's discussion.
//!
//! The bridge acknowledges a pull request by posting a comment under its own
//! identity, so "has the bot already commented" doubles as "has a build
//! already been requested for the current state". The evaluator scans the
//! whole discussion, oldest first; it never stops at the first entry, since
//! the bot's acknowledgement can appear anywhere in the thread.

use crate::types::{DiscussionEntry, DiscussionKind};

/// What to do when a pull request has no discussion at all.
///
/// An empty discussion gives the evaluator nothing to go on: there is no
/// trigger comment, but also no bot acknowledgement. Which way that cuts is
/// a deployment decision, so it is an explicit policy rather than a
/// side effect of loop structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyDiscussionPolicy {
    /// Do not trigger a build for a PR nobody has commented on.
    #[default]
    Ignore,

    /// Treat an unacknowledged PR as needing a build.
    Trigger,
}

/// Decides whether a build should be requested, given a PR's discussion.
///
/// Returns false as soon as the discussion is known to contain an issue
/// comment authored by `bot_login`: the PR has been acknowledged and a
/// duplicate request must not be sent. A non-empty discussion without such
/// a comment is an unacknowledged PR and returns true. An empty discussion
/// is decided by `empty_policy`.
pub fn is_trigger_needed(
    entries: &[DiscussionEntry],
    bot_login: &str,
    empty_policy: EmptyDiscussionPolicy,
) -> bool {
    if entries.is_empty() {
        return matches!(empty_policy, EmptyDiscussionPolicy::Trigger);
    }

    !entries
        .iter()
        .any(|entry| entry.kind == DiscussionKind::IssueComment && entry.author == bot_login)
}

/// Decides whether a freshly created comment is an explicit build trigger.
///
/// Used by the webhook path: the comment body must exactly equal the
/// configured trigger string, and the author must not be the bot itself
/// (the bot's own result comments must never re-trigger a build).
pub fn comment_triggers(body: &str, author: &str, trigger_string: &str, bot_login: &str) -> bool {
    author != bot_login && body == trigger_string
}
