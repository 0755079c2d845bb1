//! Buildbot integration: the change-hook client and builder status feed.

pub mod client;
pub mod error;

pub use client::BuildbotClient;
pub use error::{BuildbotApiError, BuildbotErrorKind};
