//! Buildbot Bridge - connects a GitHub repository's pull requests with a
//! Buildbot CI server.
//!
//! The bridge watches for build triggers (PR comments, by webhook or by
//! polling), submits change requests to Buildbot with the pull request
//! number and revision embedded as build properties, and posts the build
//! result back on the originating pull request once the build shows up in
//! the builder's status feed.

pub mod buildbot;
pub mod cache;
pub mod config;
pub mod engine;
pub mod github;
pub mod poller;
pub mod server;
pub mod status;
pub mod trigger;
pub mod types;
pub mod webhooks;
