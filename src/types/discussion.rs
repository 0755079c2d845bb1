//! Pull request discussion entries.
//!
//! A discussion is the ordered sequence of comments and events on a pull
//! request, oldest first. The trigger evaluator scans it to decide whether a
//! build has already been requested for the current state of the PR.

use serde::{Deserialize, Serialize};

/// The kind of a discussion entry.
///
/// Only issue comments participate in trigger evaluation; the other kinds
/// are carried so the evaluator can skip them without the fetch layer having
/// to pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionKind {
    /// A comment on the PR conversation tab.
    ///
    /// In GitHub's model these are "issue comments" even when they are on a
    /// pull request.
    IssueComment,

    /// A review or review comment.
    Review,

    /// A commit pushed to the PR branch.
    Commit,

    /// Anything else the code host reports in the timeline.
    Other,
}

/// One entry in a pull request's discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionEntry {
    /// The login of the user who authored the entry.
    pub author: String,

    /// What kind of entry this is.
    pub kind: DiscussionKind,

    /// The entry body. Empty for entries without text (e.g., commits).
    pub body: String,
}

impl DiscussionEntry {
    /// Creates an issue-comment entry. Convenience for the common case.
    pub fn comment(author: impl Into<String>, body: impl Into<String>) -> Self {
        DiscussionEntry {
            author: author.into(),
            kind: DiscussionKind::IssueComment,
            body: body.into(),
        }
    }
}
