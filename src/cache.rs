//! The in-memory request cache.
//!
//! One entry per correlation key tracks the lifecycle of a pull-request
//! build attempt: requested, accepted by the CI server, completed, result
//! comment posted. The cache is the join point between the two independent
//! event sources (the trigger watcher and the build watcher); each side
//! finds the other's work by key.
//!
//! The cache is an owned component: construct one, hand it to the engine.
//! There is no ambient singleton, so tests get a fresh cache per case.
//!
//! Entries are never removed. The process keeps every key it has ever
//! requested a build for; this is a known growth limitation of the design,
//! bounded in practice by the number of (PR, revision) pairs a repository
//! produces over one process lifetime.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{CorrelationKey, PrNumber};

/// The state of one pull-request build attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEntry {
    /// The pull request this attempt belongs to. Immutable once set.
    pub pull_request_id: PrNumber,

    /// True from the moment a build is requested until a matching
    /// completion is observed.
    pub build_pending: bool,

    /// True once the CI server has confirmed accepting the change request.
    pub build_forced: bool,

    /// True once the result comment has been confirmed posted.
    pub comment_posted: bool,

    /// When this entry was last mutated. Observability only; nothing reads
    /// this for eviction or matching.
    pub updated_at: DateTime<Utc>,
}

impl RequestEntry {
    fn new(pull_request_id: PrNumber) -> Self {
        RequestEntry {
            pull_request_id,
            build_pending: true,
            build_forced: false,
            comment_posted: false,
            updated_at: Utc::now(),
        }
    }

    /// True while a build request is in flight or confirmed accepted.
    ///
    /// An active entry suppresses further triggers for the same key.
    pub fn is_active(&self) -> bool {
        self.build_pending || self.build_forced
    }
}

/// How `get_or_create` found (or made) the entry for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No entry existed; one was created with `build_pending = true`.
    Created,

    /// An idle entry existed (an earlier request attempt failed);
    /// `build_pending` was set again so a retried build can be matched.
    Rearmed,

    /// An active entry existed and was left untouched. The caller must not
    /// submit another build for this key.
    AlreadyActive,
}

/// Mapping from correlation key to request state.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: HashMap<CorrelationKey, RequestEntry>,
}

impl RequestCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        RequestCache::default()
    }

    /// Returns the entry for a key, creating or re-arming it as needed.
    ///
    /// This is the trigger path's single check-then-set step: the decision
    /// "does this trigger get to submit a build" and the state change that
    /// records the submission happen in one call, so two triggers for the
    /// same key arriving in one burst cannot both submit.
    pub fn get_or_create(
        &mut self,
        key: &CorrelationKey,
        pull_request_id: PrNumber,
    ) -> (&RequestEntry, Admission) {
        use std::collections::hash_map::Entry;

        match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                if entry.is_active() {
                    (entry, Admission::AlreadyActive)
                } else {
                    entry.build_pending = true;
                    entry.updated_at = Utc::now();
                    (entry, Admission::Rearmed)
                }
            }
            Entry::Vacant(vacant) => {
                let entry = vacant.insert(RequestEntry::new(pull_request_id));
                (entry, Admission::Created)
            }
        }
    }

    /// Non-mutating read.
    ///
    /// On the completion path, `None` means "this build was not initiated
    /// by us" (or the process restarted since requesting it). That is an
    /// expected no-op for the caller, not an error.
    pub fn lookup(&self, key: &CorrelationKey) -> Option<&RequestEntry> {
        self.entries.get(key)
    }

    /// Records that the CI server accepted the change request.
    pub fn mark_forced(&mut self, key: &CorrelationKey) {
        self.mutate(key, "mark_forced", |entry| entry.build_forced = true);
    }

    /// Records that the change request was not accepted.
    ///
    /// Clears `build_pending` so the entry is idle: the next trigger for
    /// the same key is free to retry. An entry left pending here would
    /// suppress every future trigger for the key and the build would never
    /// be requested.
    pub fn mark_request_failed(&mut self, key: &CorrelationKey) {
        self.mutate(key, "mark_request_failed", |entry| {
            entry.build_pending = false;
        });
    }

    /// Records that a matching completed build was observed.
    pub fn mark_build_seen(&mut self, key: &CorrelationKey) {
        self.mutate(key, "mark_build_seen", |entry| entry.build_pending = false);
    }

    /// Records that the result comment was posted.
    pub fn mark_comment_posted(&mut self, key: &CorrelationKey) {
        self.mutate(key, "mark_comment_posted", |entry| {
            entry.comment_posted = true;
        });
    }

    /// Number of live entries. Exposed for observability.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no builds have been requested yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn mutate(&mut self, key: &CorrelationKey, op: &'static str, f: impl FnOnce(&mut RequestEntry)) {
        match self.entries.get_mut(key) {
            Some(entry) => {
                f(entry);
                entry.updated_at = Utc::now();
            }
            None => {
                // Informational, not an error: transitions on unknown keys
                // are defined as no-ops.
                debug!(key = %key, op, "transition on absent cache entry ignored");
            }
        }
    }
}
