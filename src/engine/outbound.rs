//! Capability traits for the engine's collaborators.
//!
//! The engine never talks to GitHub or Buildbot directly; it is generic
//! over these traits. The production implementations live in the `github`
//! and `buildbot` modules, and tests substitute recording mocks, which is
//! what keeps the state machine testable without a network.

use std::fmt;
use std::future::Future;

use crate::types::{DiscussionEntry, OpenPullRequest, PrNumber, Sha};

/// The category attached to every change request this bridge submits.
pub const CATEGORY_PULL_REQUEST: &str = "pull_request";

/// The comment attached to every change request this bridge submits.
pub const CHANGE_COMMENTS: &str = "triggered build";

/// A change request submitted to the CI server to start a build.
///
/// The pull request number and revision travel twice: once as first-class
/// change fields, and once as opaque build properties so the finished build
/// can be correlated back to the request cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    /// The pull request the build is for.
    pub pull_request_id: PrNumber,

    /// The head revision to build.
    pub revision: Sha,

    /// The login of the user the change is attributed to.
    pub who: String,

    /// The CI project name.
    pub project: String,

    /// The repository the change belongs to (as the CI server knows it).
    pub repository: String,

    /// The branch the revision lives on.
    pub branch: String,

    /// The change category; always [`CATEGORY_PULL_REQUEST`] for this bridge.
    pub category: String,
}

/// Submits change requests to the CI server.
pub trait BuildRequester {
    /// The error type returned by this requester.
    type Error: fmt::Display;

    /// Asks the CI server to schedule a build for the given change.
    ///
    /// `Ok` means the server accepted the change, not that a build ran.
    fn request_build(
        &self,
        change: ChangeRequest,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Posts comments on pull requests.
pub trait CommentPoster {
    /// The error type returned by this poster.
    type Error: fmt::Display;

    /// Posts `body` as a new comment on the given pull request.
    fn post_comment(
        &self,
        pr: PrNumber,
        body: String,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Reads pull request state from the code host.
///
/// The webhook path needs this: an `issue_comment` payload does not carry
/// the PR's head revision, so the runtime fetches the PR (and its
/// discussion, for duplicate suppression) before building a trigger.
pub trait PullRequestSource {
    /// The error type returned by this source.
    type Error: fmt::Display;

    /// Fetches the current state of one pull request.
    fn fetch_pull_request(
        &self,
        pr: PrNumber,
    ) -> impl Future<Output = Result<OpenPullRequest, Self::Error>> + Send;

    /// Fetches the ordered discussion of one pull request, oldest first.
    fn fetch_discussion(
        &self,
        pr: PrNumber,
    ) -> impl Future<Output = Result<Vec<DiscussionEntry>, Self::Error>> + Send;
}
