//! The open-pull-request watcher.
//!
//! Each cycle lists the repository's open PRs, skips the ones that have not
//! changed since the previous cycle, and runs the trigger evaluator over
//! each changed PR's discussion. PRs that need a build are sent to the
//! engine as `EngineMessage::Trigger`.
//!
//! This loop is the fallback trigger source when webhooks are not
//! configured (and a safety net for missed deliveries when they are); the
//! engine's cache suppresses duplicates either way.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{BuildTrigger, EngineMessage, TriggerSettings};
use crate::github::GitHubClient;
use crate::trigger::is_trigger_needed;
use crate::types::{OpenPullRequest, PrNumber};

/// Polls the open-PR list and emits triggers for PRs that need a build.
pub struct PullRequestWatcher {
    client: GitHubClient,
    tx: mpsc::Sender<EngineMessage>,
    triggers: TriggerSettings,
    interval: Duration,

    /// Last seen `updated_at` per PR; unchanged PRs are skipped.
    seen: HashMap<PrNumber, DateTime<Utc>>,
}

impl PullRequestWatcher {
    /// Creates a watcher that sends triggers into `tx` every `interval`.
    pub fn new(
        client: GitHubClient,
        tx: mpsc::Sender<EngineMessage>,
        triggers: TriggerSettings,
        interval: Duration,
    ) -> Self {
        PullRequestWatcher {
            client,
            tx,
            triggers,
            interval,
            seen: HashMap::new(),
        }
    }

    /// Runs until cancelled or the engine side of the channel closes.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(repo = %self.client.repo(), interval_secs = self.interval.as_secs(),
              "pull request watcher started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.poll_once().await {
                        break;
                    }
                }
            }
        }

        info!("pull request watcher stopped");
    }

    /// One poll cycle. Returns false when the engine channel has closed.
    async fn poll_once(&mut self) -> bool {
        let pulls = match self.client.list_open_pull_requests().await {
            Ok(pulls) => pulls,
            Err(err) => {
                warn!(error = %err, "could not list open pull requests; skipping cycle");
                return true;
            }
        };

        for pull in select_changed(pulls, &mut self.seen) {
            let discussion = match self.client.get_discussion(pull.number).await {
                Ok(discussion) => discussion,
                Err(err) => {
                    warn!(pr = %pull.number, error = %err, "could not fetch discussion; skipping PR");
                    continue;
                }
            };

            if !is_trigger_needed(
                &discussion,
                &self.triggers.bot_login,
                self.triggers.empty_discussion,
            ) {
                debug!(pr = %pull.number, "no build needed");
                continue;
            }

            let message = EngineMessage::Trigger(BuildTrigger {
                pr: pull.number,
                head_sha: pull.head_sha,
                head_branch: pull.head_branch,
                author: pull.author,
            });

            if self.tx.send(message).await.is_err() {
                return false;
            }
        }

        true
    }
}

/// Filters the PR list down to entries that changed since the last cycle,
/// updating the poll cache as it goes.
pub fn select_changed(
    pulls: Vec<OpenPullRequest>,
    seen: &mut HashMap<PrNumber, DateTime<Utc>>,
) -> Vec<OpenPullRequest> {
    pulls
        .into_iter()
        .filter(|pull| seen.insert(pull.number, pull.updated_at) != Some(pull.updated_at))
        .collect()
}
