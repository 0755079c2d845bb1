//! The builder status watcher.
//!
//! Each cycle fetches the builder's build list and forwards builds not seen
//! before to the engine as `EngineMessage::BuildObserved`. The engine
//! decides whether a build belongs to one of our requests; on the first
//! cycle after startup the whole build history flows through and resolves
//! as unmatched no-ops, which is the intended cold-start behavior.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buildbot::BuildbotClient;
use crate::engine::EngineMessage;
use crate::types::{BuildNumber, ObservedBuild};

/// Polls the builder status feed and emits newly appeared builds.
pub struct BuildWatcher {
    client: BuildbotClient,
    tx: mpsc::Sender<EngineMessage>,
    interval: Duration,

    /// Build numbers already forwarded to the engine.
    seen: HashSet<BuildNumber>,
}

impl BuildWatcher {
    /// Creates a watcher that sends observed builds into `tx` every `interval`.
    pub fn new(
        client: BuildbotClient,
        tx: mpsc::Sender<EngineMessage>,
        interval: Duration,
    ) -> Self {
        BuildWatcher {
            client,
            tx,
            interval,
            seen: HashSet::new(),
        }
    }

    /// Runs until cancelled or the engine side of the channel closes.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(builder = %self.client.builder_name(), interval_secs = self.interval.as_secs(),
              "build watcher started");

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

        info!("build watcher stopped");
    }

    /// One poll cycle. Returns false when the engine channel has closed.
    async fn poll_once(&mut self) -> bool {
        let builds = match self.client.recent_builds().await {
            Ok(builds) => builds,
            Err(err) => {
                warn!(error = %err, "could not fetch builder status; skipping cycle");
                return true;
            }
        };

        for build in select_new_builds(builds, &mut self.seen) {
            debug!(build = %build.number, "new build observed");
            if self
                .tx
                .send(EngineMessage::BuildObserved(build))
                .await
                .is_err()
            {
                return false;
            }
        }

        true
    }
}

/// Filters the build list down to builds not yet forwarded, updating the
/// seen set as it goes.
pub fn select_new_builds(
    builds: Vec<ObservedBuild>,
    seen: &mut HashSet<BuildNumber>,
) -> Vec<ObservedBuild> {
    builds
        .into_iter()
        .filter(|build| seen.insert(build.number))
        .collect()
}
