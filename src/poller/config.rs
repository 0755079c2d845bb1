//! Polling configuration.
//!
//! The bridge watches two feeds: the code host's open pull requests and the
//! CI server's builder status. Each gets its own interval, since the two
//! servers tolerate very different request rates. A deterministic jitter is
//! added per repository so a fleet of bridges restarting together does not
//! poll in lockstep.

use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::types::RepoId;

/// Default interval between open-PR polls (1 minute).
const DEFAULT_GITHUB_INTERVAL_SECS: u64 = 60;

/// Default interval between builder status polls (30 seconds).
const DEFAULT_BUILDBOT_INTERVAL_SECS: u64 = 30;

/// Default jitter percentage (0-100).
const DEFAULT_JITTER_PERCENT: u8 = 20;

/// Intervals for the two poll loops.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Interval between open-PR list polls.
    ///
    /// Default: 1 minute. Configure via `BRIDGE_GITHUB_POLL_INTERVAL_SECS`.
    pub github_interval: Duration,

    /// Interval between builder status polls.
    ///
    /// Default: 30 seconds. Configure via `BRIDGE_BUILDBOT_POLL_INTERVAL_SECS`.
    pub buildbot_interval: Duration,

    /// Jitter percentage added to each interval (0-100).
    pub jitter_percent: u8,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PollConfig {
    /// Creates a `PollConfig` with default values.
    pub fn new() -> Self {
        PollConfig {
            github_interval: Duration::from_secs(DEFAULT_GITHUB_INTERVAL_SECS),
            buildbot_interval: Duration::from_secs(DEFAULT_BUILDBOT_INTERVAL_SECS),
            jitter_percent: DEFAULT_JITTER_PERCENT,
        }
    }

    /// Creates a `PollConfig` from environment variables, with defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        PollConfig {
            github_interval: env_secs(
                "BRIDGE_GITHUB_POLL_INTERVAL_SECS",
                DEFAULT_GITHUB_INTERVAL_SECS,
            ),
            buildbot_interval: env_secs(
                "BRIDGE_BUILDBOT_POLL_INTERVAL_SECS",
                DEFAULT_BUILDBOT_INTERVAL_SECS,
            ),
            jitter_percent: DEFAULT_JITTER_PERCENT,
        }
    }

    /// Returns the open-PR poll interval with jitter for a repository.
    ///
    /// The jitter is deterministic in the repo ID, so the same deployment
    /// always polls at the same cadence while different deployments spread
    /// out.
    pub fn github_interval_with_jitter(&self, repo: &RepoId) -> Duration {
        jittered(self.github_interval, self.jitter_percent, repo_hash(repo))
    }

    /// Returns the builder status poll interval with jitter for a repository.
    pub fn buildbot_interval_with_jitter(&self, repo: &RepoId) -> Duration {
        // Offset the hash so the two loops don't share a phase.
        jittered(
            self.buildbot_interval,
            self.jitter_percent,
            repo_hash(repo).rotate_left(1),
        )
    }
}

fn env_secs(var: &str, default_secs: u64) -> Duration {
    let secs = std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

fn jittered(interval: Duration, jitter_percent: u8, hash: u64) -> Duration {
    if jitter_percent == 0 {
        return interval;
    }
    let jitter = (hash % jitter_percent as u64) as f64 / 100.0;
    Duration::from_secs_f64(interval.as_secs_f64() * (1.0 + jitter))
}

fn repo_hash(repo: &RepoId) -> u64 {
    let mut hasher = std::hash::DefaultHasher::new();
    repo.hash(&mut hasher);
    hasher.finish()
}
