//! GitHub integration: the repository-scoped API client.

pub mod client;
pub mod error;

pub use client::GitHubClient;
pub use error::{GitHubApiError, GitHubErrorKind};
