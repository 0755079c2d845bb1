//! Periodic watchers feeding the engine's message channel.

pub mod buildbot;
pub mod config;
pub mod github;

pub use buildbot::BuildWatcher;
pub use config::PollConfig;
pub use github::PullRequestWatcher;
