//! Pull request metadata as seen by the poll source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PrNumber, Sha};

/// An open pull request as reported by the code host.
///
/// This is the shape the GitHub poller and the webhook path both reduce to
/// before handing a trigger to the engine: just enough to derive the
/// correlation key and fill in the change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPullRequest {
    /// The PR number.
    pub number: PrNumber,

    /// When the PR (including its issue thread) was last updated.
    ///
    /// The poller uses this to skip PRs that have not changed since the
    /// previous cycle.
    pub updated_at: DateTime<Utc>,

    /// The current head SHA of the PR branch.
    pub head_sha: Sha,

    /// The name of the PR's head branch (e.g., "feature-branch").
    pub head_branch: String,

    /// The login of the PR author.
    pub author: String,
}
