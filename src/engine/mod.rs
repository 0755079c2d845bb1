//! The reconciliation engine.
//!
//! Correlates the two asynchronous event streams the bridge watches: build
//! triggers coming from the code host, and completed builds coming from the
//! CI server. The engine owns the request cache and drives each correlation
//! key through its lifecycle:
//!
//! ```text
//! NEW --on_trigger--> PENDING --on_build_observed--> RESOLVED
//! ```
//!
//! `RESOLVED` is terminal; entries are retained for the life of the
//! process. Duplicate triggers and duplicate completions are suppressed
//! no-ops, and collaborator failures leave the cache in a state from which
//! the next poll cycle can make progress. Nothing here is allowed to crash
//! the process.

pub mod message;
pub mod outbound;
pub mod runtime;

pub use message::{CommentSeen, EngineMessage};
pub use outbound::{
    BuildRequester, CATEGORY_PULL_REQUEST, CHANGE_COMMENTS, ChangeRequest, CommentPoster,
    PullRequestSource,
};
pub use runtime::{EngineRuntime, TriggerSettings};

use tracing::{debug, info, warn};

use crate::cache::{Admission, RequestCache};
use crate::status::{classify_log, render_result_comment};
use crate::types::{CorrelationKey, ObservedBuild, PrNumber, Sha};

/// A request to build a pull request at a specific head revision.
///
/// Produced by the polling watcher (after trigger evaluation) or by the
/// runtime's webhook path (after fetching the PR head).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTrigger {
    /// The pull request to build.
    pub pr: PrNumber,

    /// The head revision at trigger time.
    pub head_sha: Sha,

    /// The branch the head revision lives on.
    pub head_branch: String,

    /// The login of the PR author; the change request is attributed to them.
    pub author: String,
}

impl BuildTrigger {
    /// The correlation key for this trigger.
    pub fn key(&self) -> CorrelationKey {
        CorrelationKey::new(self.pr, &self.head_sha)
    }
}

/// What `on_trigger` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A change request was submitted and accepted.
    Requested,

    /// A build for this key is already pending or forced; nothing was sent.
    Suppressed,

    /// The change request was submitted and rejected. The cache entry is
    /// left idle so the next trigger for this key retries.
    RequestFailed,
}

/// What `on_build_observed` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The build matched a pending entry and the result comment was posted.
    CommentPosted,

    /// The build carried no usable correlation properties, or no cache
    /// entry matched. Not initiated by us; ignored.
    Unmatched,

    /// The matched entry was no longer pending: a duplicate notification.
    Duplicate,

    /// The build matched and was recorded, but posting the result comment
    /// failed. The result is lost; this is a documented trade-off.
    PostFailed,
}

/// Fixed change-request fields taken from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// The CI project name sent with every change request.
    pub project: String,

    /// The repository identifier sent with every change request.
    pub repository: String,
}

/// Correlates triggers with completed builds through the request cache.
#[derive(Debug)]
pub struct ReconciliationEngine<R, P> {
    cache: RequestCache,
    requester: R,
    poster: P,
    settings: EngineSettings,
}

impl<R, P> ReconciliationEngine<R, P>
where
    R: BuildRequester,
    P: CommentPoster,
{
    /// Creates an engine around an (often empty) cache and its outbound
    /// collaborators.
    pub fn new(cache: RequestCache, requester: R, poster: P, settings: EngineSettings) -> Self {
        ReconciliationEngine {
            cache,
            requester,
            poster,
            settings,
        }
    }

    /// Read access to the cache, for observability and tests.
    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// Handles a build trigger for a pull request at a specific revision.
    ///
    /// Creating (or re-arming) the cache entry and deciding to submit are a
    /// single indivisible step; a second trigger for the same key arriving
    /// before the CI server answers is suppressed by the entry's pending
    /// flag, not by any lock.
    pub async fn on_trigger(&mut self, trigger: BuildTrigger) -> TriggerOutcome {
        let key = trigger.key();
        let (_, admission) = self.cache.get_or_create(&key, trigger.pr);

        if admission == Admission::AlreadyActive {
            debug!(key = %key, pr = %trigger.pr, "build already requested for this revision");
            return TriggerOutcome::Suppressed;
        }

        info!(key = %key, pr = %trigger.pr, branch = %trigger.head_branch, "requesting build");

        let change = ChangeRequest {
            pull_request_id: trigger.pr,
            revision: trigger.head_sha.clone(),
            who: trigger.author,
            project: self.settings.project.clone(),
            repository: self.settings.repository.clone(),
            branch: trigger.head_branch,
            category: CATEGORY_PULL_REQUEST.to_string(),
        };

        match self.requester.request_build(change).await {
            Ok(()) => {
                self.cache.mark_forced(&key);
                TriggerOutcome::Requested
            }
            Err(err) => {
                // At most one attempt per trigger. The idle entry lets the
                // next trigger for this key try again.
                warn!(key = %key, error = %err, "CI server did not accept the change request");
                self.cache.mark_request_failed(&key);
                TriggerOutcome::RequestFailed
            }
        }
    }

    /// Handles a completed build reported by the build watcher.
    pub async fn on_build_observed(&mut self, build: ObservedBuild) -> CompletionOutcome {
        let Some((pr, revision)) = build.correlation() else {
            debug!(build = %build.number, builder = %build.builder_name,
                   "build carries no correlation properties; ignoring");
            return CompletionOutcome::Unmatched;
        };

        let key = CorrelationKey::new(pr, &revision);

        match self.cache.lookup(&key) {
            None => {
                debug!(key = %key, build = %build.number, "no pending request for this build; ignoring");
                CompletionOutcome::Unmatched
            }
            Some(entry) if !entry.build_pending => {
                debug!(key = %key, build = %build.number, "build already resolved; duplicate notification");
                CompletionOutcome::Duplicate
            }
            Some(_) => {
                self.cache.mark_build_seen(&key);

                let outcome = classify_log(&build.text);
                info!(key = %key, build = %build.number, status = outcome.as_status_str(),
                      "build completed");

                let body =
                    render_result_comment(pr, build.number, &build.builder_name, &revision, outcome);

                match self.poster.post_comment(pr, body).await {
                    Ok(()) => {
                        self.cache.mark_comment_posted(&key);
                        CompletionOutcome::CommentPosted
                    }
                    Err(err) => {
                        // No retry: the build result for this entry is lost.
                        warn!(key = %key, pr = %pr, error = %err,
                              "result comment could not be posted");
                        CompletionOutcome::PostFailed
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::types::BuildNumber;
    use crate::types::build::{PROP_PULL_REQUEST_ID, PROP_REVISION};

    /// Records change requests; fails the first `fail_first` calls.
    #[derive(Debug, Default)]
    struct RecordingRequester {
        calls: Mutex<Vec<ChangeRequest>>,
        fail_first: AtomicUsize,
    }

    impl BuildRequester for &RecordingRequester {
        type Error = String;

        async fn request_build(&self, change: ChangeRequest) -> Result<(), String> {
            self.calls.lock().unwrap().push(change);
            let remaining = self.fail_first.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_first.store(remaining - 1, Ordering::SeqCst);
                return Err("change hook returned 500".to_string());
            }
            Ok(())
        }
    }

    /// Records posted comments; fails every call when `fail` is set.
    #[derive(Debug, Default)]
    struct RecordingPoster {
        calls: Mutex<Vec<(PrNumber, String)>>,
        fail: bool,
    }

    impl CommentPoster for &RecordingPoster {
        type Error = String;

        async fn post_comment(&self, pr: PrNumber, body: String) -> Result<(), String> {
            self.calls.lock().unwrap().push((pr, body));
            if self.fail {
                Err("403 forbidden".to_string())
            } else {
                Ok(())
            }
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            project: "widget".to_string(),
            repository: "git://example.com/widget.git".to_string(),
        }
    }

    fn trigger() -> BuildTrigger {
        BuildTrigger {
            pr: PrNumber(42),
            head_sha: Sha::new("abc123"),
            head_branch: "feature".to_string(),
            author: "alice".to_string(),
        }
    }

    fn completed_build(text: &str) -> ObservedBuild {
        ObservedBuild {
            number: BuildNumber(12),
            properties: vec![
                (PROP_PULL_REQUEST_ID.to_string(), "42".to_string()),
                (PROP_REVISION.to_string(), "abc123".to_string()),
            ],
            text: text.to_string(),
            branch: Some("feature".to_string()),
            builder_name: "pull-requests".to_string(),
        }
    }

    #[tokio::test]
    async fn trigger_submits_one_change_request() {
        let requester = RecordingRequester::default();
        let poster = RecordingPoster::default();
        let mut engine =
            ReconciliationEngine::new(RequestCache::new(), &requester, &poster, settings());

        let outcome = engine.on_trigger(trigger()).await;

        assert_eq!(outcome, TriggerOutcome::Requested);
        let calls = requester.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].pull_request_id, PrNumber(42));
        assert_eq!(calls[0].revision, Sha::new("abc123"));
        assert_eq!(calls[0].who, "alice");
        assert_eq!(calls[0].project, "widget");
        assert_eq!(calls[0].branch, "feature");
        assert_eq!(calls[0].category, CATEGORY_PULL_REQUEST);

        let entry = engine.cache().lookup(&trigger().key()).unwrap();
        assert!(entry.build_pending);
        assert!(entry.build_forced);
    }

    #[tokio::test]
    async fn double_trigger_submits_once() {
        let requester = RecordingRequester::default();
        let poster = RecordingPoster::default();
        let mut engine =
            ReconciliationEngine::new(RequestCache::new(), &requester, &poster, settings());

        assert_eq!(engine.on_trigger(trigger()).await, TriggerOutcome::Requested);
        assert_eq!(engine.on_trigger(trigger()).await, TriggerOutcome::Suppressed);

        assert_eq!(requester.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_request_is_retried_by_the_next_trigger() {
        let requester = RecordingRequester {
            fail_first: AtomicUsize::new(1),
            ..RecordingRequester::default()
        };
        let poster = RecordingPoster::default();
        let mut engine =
            ReconciliationEngine::new(RequestCache::new(), &requester, &poster, settings());

        assert_eq!(
            engine.on_trigger(trigger()).await,
            TriggerOutcome::RequestFailed
        );
        let entry = engine.cache().lookup(&trigger().key()).unwrap();
        assert!(!entry.build_pending);
        assert!(!entry.build_forced);

        // The same trigger condition coming around again retries.
        assert_eq!(engine.on_trigger(trigger()).await, TriggerOutcome::Requested);
        assert_eq!(requester.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn successful_build_posts_success_comment() {
        let requester = RecordingRequester::default();
        let poster = RecordingPoster::default();
        let mut engine =
            ReconciliationEngine::new(RequestCache::new(), &requester, &poster, settings());

        engine.on_trigger(trigger()).await;
        let outcome = engine
            .on_build_observed(completed_build("All tests BUILD OK"))
            .await;

        assert_eq!(outcome, CompletionOutcome::CommentPosted);

        let posts = poster.calls.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, PrNumber(42));
        assert!(posts[0].1.contains("status: success"));

        let entry = engine.cache().lookup(&trigger().key()).unwrap();
        assert!(!entry.build_pending);
        assert!(entry.comment_posted);
    }

    #[tokio::test]
    async fn failed_build_posts_failure_comment() {
        let requester = RecordingRequester::default();
        let poster = RecordingPoster::default();
        let mut engine =
            ReconciliationEngine::new(RequestCache::new(), &requester, &poster, settings());

        engine.on_trigger(trigger()).await;
        engine
            .on_build_observed(completed_build("step 4: BUILD FAILED"))
            .await;

        let posts = poster.calls.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].1.contains("status: failure"));
    }

    #[tokio::test]
    async fn duplicate_completion_posts_nothing() {
        let requester = RecordingRequester::default();
        let poster = RecordingPoster::default();
        let mut engine =
            ReconciliationEngine::new(RequestCache::new(), &requester, &poster, settings());

        engine.on_trigger(trigger()).await;
        engine
            .on_build_observed(completed_build("All tests BUILD OK"))
            .await;
        let outcome = engine
            .on_build_observed(completed_build("All tests BUILD OK"))
            .await;

        assert_eq!(outcome, CompletionOutcome::Duplicate);
        assert_eq!(poster.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unmatched_completion_touches_nothing() {
        let requester = RecordingRequester::default();
        let poster = RecordingPoster::default();
        let mut engine =
            ReconciliationEngine::new(RequestCache::new(), &requester, &poster, settings());

        let outcome = engine
            .on_build_observed(completed_build("All tests BUILD OK"))
            .await;

        assert_eq!(outcome, CompletionOutcome::Unmatched);
        assert!(engine.cache().is_empty());
        assert!(poster.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn build_without_properties_is_ignored() {
        let requester = RecordingRequester::default();
        let poster = RecordingPoster::default();
        let mut engine =
            ReconciliationEngine::new(RequestCache::new(), &requester, &poster, settings());

        engine.on_trigger(trigger()).await;

        let mut build = completed_build("All tests BUILD OK");
        build.properties.clear();
        let outcome = engine.on_build_observed(build).await;

        assert_eq!(outcome, CompletionOutcome::Unmatched);
        // The pending entry is untouched.
        assert!(engine.cache().lookup(&trigger().key()).unwrap().build_pending);
    }

    #[tokio::test]
    async fn failed_comment_post_is_not_retried() {
        let requester = RecordingRequester::default();
        let poster = RecordingPoster {
            fail: true,
            ..RecordingPoster::default()
        };
        let mut engine =
            ReconciliationEngine::new(RequestCache::new(), &requester, &poster, settings());

        engine.on_trigger(trigger()).await;
        let outcome = engine
            .on_build_observed(completed_build("All tests BUILD OK"))
            .await;

        assert_eq!(outcome, CompletionOutcome::PostFailed);
        let entry = engine.cache().lookup(&trigger().key()).unwrap();
        assert!(!entry.build_pending);
        assert!(!entry.comment_posted);

        // A duplicate notification later does not resurrect the post.
        let outcome = engine
            .on_build_observed(completed_build("All tests BUILD OK"))
            .await;
        assert_eq!(outcome, CompletionOutcome::Duplicate);
        assert_eq!(poster.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn new_revision_of_same_pr_gets_its_own_build() {
        let requester = RecordingRequester::default();
        let poster = RecordingPoster::default();
        let mut engine =
            ReconciliationEngine::new(RequestCache::new(), &requester, &poster, settings());

        engine.on_trigger(trigger()).await;

        let mut second = trigger();
        second.head_sha = Sha::new("def456");
        assert_eq!(engine.on_trigger(second).await, TriggerOutcome::Requested);
        assert_eq!(requester.calls.lock().unwrap().len(), 2);
    }
}
