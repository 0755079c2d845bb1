//! The engine event loop.
//!
//! One task owns the engine and drains the shared message channel. All
//! cache mutations happen on this task, so every logical step (trigger
//! admission, completion matching) is atomic without locks; the watchers
//! and the webhook listener only ever send messages.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::trigger::{EmptyDiscussionPolicy, comment_triggers, is_trigger_needed};

use super::message::{CommentSeen, EngineMessage};
use super::outbound::{BuildRequester, CommentPoster, PullRequestSource};
use super::{BuildTrigger, ReconciliationEngine};

/// Trigger-evaluation settings shared by the webhook path.
#[derive(Debug, Clone)]
pub struct TriggerSettings {
    /// The bridge's own login on the code host.
    pub bot_login: String,

    /// The comment body that explicitly requests a build.
    pub trigger_string: String,

    /// What to do with a PR whose discussion is empty.
    pub empty_discussion: EmptyDiscussionPolicy,
}

/// Drives a [`ReconciliationEngine`] from an [`EngineMessage`] channel.
pub struct EngineRuntime<S, R, P> {
    engine: ReconciliationEngine<R, P>,
    source: S,
    triggers: TriggerSettings,
}

impl<S, R, P> EngineRuntime<S, R, P>
where
    S: PullRequestSource,
    R: BuildRequester,
    P: CommentPoster,
{
    /// Creates a runtime around an engine and a pull request source.
    pub fn new(
        engine: ReconciliationEngine<R, P>,
        source: S,
        triggers: TriggerSettings,
    ) -> Self {
        EngineRuntime {
            engine,
            source,
            triggers,
        }
    }

    /// Runs until the channel closes, a `Shutdown` message arrives, or the
    /// cancellation token fires.
    pub async fn run(mut self, mut rx: mpsc::Receiver<EngineMessage>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("engine runtime cancelled");
                    break;
                }
                msg = rx.recv() => match msg {
                    None | Some(EngineMessage::Shutdown) => {
                        info!("engine runtime shutting down");
                        break;
                    }
                    Some(msg) => self.handle(msg).await,
                }
            }
        }
    }

    async fn handle(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::Trigger(trigger) => {
                self.engine.on_trigger(trigger).await;
            }
            EngineMessage::CommentSeen(seen) => {
                self.handle_comment_seen(seen).await;
            }
            EngineMessage::BuildObserved(build) => {
                self.engine.on_build_observed(build).await;
            }
            // `run` breaks on Shutdown before dispatching here.
            EngineMessage::Shutdown => {}
        }
    }

    /// Evaluates a webhook-reported comment and triggers a build if due.
    ///
    /// The comment body must be the configured trigger string, the author
    /// must not be the bridge itself, and the PR's discussion must not
    /// already contain a bridge acknowledgement. Fetch failures drop the
    /// event; the polling watcher will pick the PR up on its next cycle.
    async fn handle_comment_seen(&mut self, seen: CommentSeen) {
        if !comment_triggers(
            &seen.body,
            &seen.author,
            &self.triggers.trigger_string,
            &self.triggers.bot_login,
        ) {
            debug!(pr = %seen.pr, comment = %seen.comment_id, "comment is not a trigger; ignoring");
            return;
        }

        let discussion = match self.source.fetch_discussion(seen.pr).await {
            Ok(discussion) => discussion,
            Err(err) => {
                warn!(pr = %seen.pr, error = %err, "could not fetch discussion; dropping trigger comment");
                return;
            }
        };

        if !is_trigger_needed(
            &discussion,
            &self.triggers.bot_login,
            self.triggers.empty_discussion,
        ) {
            info!(pr = %seen.pr, "build already acknowledged on this pull request");
            return;
        }

        let pull = match self.source.fetch_pull_request(seen.pr).await {
            Ok(pull) => pull,
            Err(err) => {
                warn!(pr = %seen.pr, error = %err, "could not fetch pull request; dropping trigger comment");
                return;
            }
        };

        self.engine
            .on_trigger(BuildTrigger {
                pr: pull.number,
                head_sha: pull.head_sha,
                head_branch: pull.head_branch,
                author: pull.author,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::Utc;

    use crate::cache::RequestCache;
    use crate::engine::EngineSettings;
    use crate::engine::outbound::ChangeRequest;
    use crate::types::{
        BuildNumber, CommentId, DiscussionEntry, ObservedBuild, OpenPullRequest, PrNumber, Sha,
    };

    const BOT: &str = "bridge-bot";
    const TRIGGER: &str = "buildbot, test this";

    #[derive(Debug, Clone, Default)]
    struct SharedRequester {
        calls: Arc<Mutex<Vec<ChangeRequest>>>,
    }

    impl BuildRequester for SharedRequester {
        type Error = String;

        async fn request_build(&self, change: ChangeRequest) -> Result<(), String> {
            self.calls.lock().unwrap().push(change);
            Ok(())
        }
    }

    #[derive(Debug, Clone, Default)]
    struct SharedPoster {
        calls: Arc<Mutex<Vec<(PrNumber, String)>>>,
    }

    impl CommentPoster for SharedPoster {
        type Error = String;

        async fn post_comment(&self, pr: PrNumber, body: String) -> Result<(), String> {
            self.calls.lock().unwrap().push((pr, body));
            Ok(())
        }
    }

    #[derive(Debug, Clone, Default)]
    struct StaticSource {
        discussion: Vec<DiscussionEntry>,
    }

    impl PullRequestSource for StaticSource {
        type Error = String;

        async fn fetch_pull_request(&self, pr: PrNumber) -> Result<OpenPullRequest, String> {
            Ok(OpenPullRequest {
                number: pr,
                updated_at: Utc::now(),
                head_sha: Sha::new("abc123"),
                head_branch: "feature".to_string(),
                author: "alice".to_string(),
            })
        }

        async fn fetch_discussion(&self, _pr: PrNumber) -> Result<Vec<DiscussionEntry>, String> {
            Ok(self.discussion.clone())
        }
    }

    fn runtime(
        source: StaticSource,
    ) -> (
        EngineRuntime<StaticSource, SharedRequester, SharedPoster>,
        SharedRequester,
        SharedPoster,
    ) {
        let requester = SharedRequester::default();
        let poster = SharedPoster::default();
        let engine = ReconciliationEngine::new(
            RequestCache::new(),
            requester.clone(),
            poster.clone(),
            EngineSettings {
                project: "widget".to_string(),
                repository: "git://example.com/widget.git".to_string(),
            },
        );
        let rt = EngineRuntime::new(
            engine,
            source,
            TriggerSettings {
                bot_login: BOT.to_string(),
                trigger_string: TRIGGER.to_string(),
                empty_discussion: EmptyDiscussionPolicy::Ignore,
            },
        );
        (rt, requester, poster)
    }

    fn comment(author: &str, body: &str) -> CommentSeen {
        CommentSeen {
            pr: PrNumber(42),
            comment_id: CommentId(1),
            author: author.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn trigger_comment_requests_build() {
        let source = StaticSource {
            discussion: vec![DiscussionEntry::comment("alice", TRIGGER)],
        };
        let (mut rt, requester, _poster) = runtime(source);

        rt.handle_comment_seen(comment("alice", TRIGGER)).await;

        let calls = requester.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].pull_request_id, PrNumber(42));
        assert_eq!(calls[0].revision, Sha::new("abc123"));
    }

    #[tokio::test]
    async fn non_trigger_comment_is_ignored() {
        let source = StaticSource {
            discussion: vec![DiscussionEntry::comment("alice", "nice work")],
        };
        let (mut rt, requester, _poster) = runtime(source);

        rt.handle_comment_seen(comment("alice", "nice work")).await;

        assert!(requester.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn acknowledged_pr_is_not_retriggered() {
        let source = StaticSource {
            discussion: vec![
                DiscussionEntry::comment("alice", TRIGGER),
                DiscussionEntry::comment(BOT, "Build 3 succeeded."),
            ],
        };
        let (mut rt, requester, _poster) = runtime(source);

        rt.handle_comment_seen(comment("alice", TRIGGER)).await;

        assert!(requester.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_processes_messages_until_shutdown() {
        let source = StaticSource {
            discussion: vec![DiscussionEntry::comment("alice", TRIGGER)],
        };
        let (rt, requester, poster) = runtime(source);

        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(rt.run(rx, cancel));

        tx.send(EngineMessage::CommentSeen(comment("alice", TRIGGER)))
            .await
            .unwrap();
        tx.send(EngineMessage::BuildObserved(ObservedBuild {
            number: BuildNumber(12),
            properties: vec![
                ("pull-request-id".to_string(), "42".to_string()),
                ("revision".to_string(), "abc123".to_string()),
            ],
            text: "All tests BUILD OK".to_string(),
            branch: Some("feature".to_string()),
            builder_name: "pull-requests".to_string(),
        }))
        .await
        .unwrap();
        tx.send(EngineMessage::Shutdown).await.unwrap();

        handle.await.unwrap();

        assert_eq!(requester.calls.lock().unwrap().len(), 1);
        let posts = poster.calls.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].1.contains("status: success"));
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let (rt, _requester, _poster) = runtime(StaticSource::default());

        let (_tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(rt.run(rx, cancel.clone()));

        cancel.cancel();
        handle.await.unwrap();
    }

    // Keep the suppressed-duplicate path honest at the runtime level too:
    // two trigger messages in one burst must submit exactly one build.
    #[tokio::test]
    async fn trigger_burst_submits_once() {
        let (mut rt, requester, _poster) = runtime(StaticSource::default());

        let trigger = BuildTrigger {
            pr: PrNumber(42),
            head_sha: Sha::new("abc123"),
            head_branch: "feature".to_string(),
            author: "alice".to_string(),
        };
        rt.handle(EngineMessage::Trigger(trigger.clone())).await;
        rt.handle(EngineMessage::Trigger(trigger)).await;

        assert_eq!(requester.calls.lock().unwrap().len(), 1);
    }
}
