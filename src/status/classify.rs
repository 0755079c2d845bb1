//! Pass/fail classification of a build's status text.
//!
//! Buildbot does not expose a single structured result field through the
//! builder status feed this bridge polls; the reliable signal is the status
//! text attached to the build. Classification is therefore a substring
//! check: a failure marker anywhere in the text means failure, anything
//! else is success.

use serde::{Deserialize, Serialize};

/// The failure marker, matched case-insensitively.
const FAILURE_MARKER: &str = "build failed";

/// The outcome of a completed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    Success,
    Failure,
}

impl BuildOutcome {
    /// Returns the human-readable status word used in result comments.
    pub fn as_status_str(&self) -> &'static str {
        match self {
            BuildOutcome::Success => "success",
            BuildOutcome::Failure => "failure",
        }
    }
}

/// Classifies a build's status text.
///
/// Failure iff the text contains the failure marker, matched
/// case-insensitively. A build with empty or unrecognised text counts as
/// success; Buildbot only emits the marker on an actual failure.
pub fn classify_log(text: &str) -> BuildOutcome {
    if text.to_lowercase().contains(FAILURE_MARKER) {
        BuildOutcome::Failure
    } else {
        BuildOutcome::Success
    }
}
