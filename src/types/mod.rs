//! Core domain types for the bridge.

pub mod build;
pub mod discussion;
pub mod ids;
pub mod pull;

pub use build::{ObservedBuild, PROP_PULL_REQUEST_ID, PROP_REVISION};
pub use discussion::{DiscussionEntry, DiscussionKind};
pub use ids::{BuildNumber, CommentId, CorrelationKey, PrNumber, RepoId, Sha};
pub use pull::OpenPullRequest;
