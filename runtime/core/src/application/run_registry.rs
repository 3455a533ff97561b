// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Run registry - tracks all active execution runs
//!
//! Process-local bookkeeping of active runs with their metadata and
//! cancellation handles, indexed by run id, conversation id and session
//! key. Mutated only at queue admission, at settlement, and by the
//! cancellation paths, which all funnel through `unregister`.

use std::collections::HashMap;

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::application::config::RuntimeConfig;
use crate::domain::error::RuntimeError;
use crate::domain::run::{LaneName, Run, RunId, RunSource, RunSpec};

#[derive(Default)]
struct RegistryInner {
    runs: HashMap<RunId, Run>,
    by_session: HashMap<String, Vec<RunId>>,
    by_conversation: HashMap<String, Vec<RunId>>,
}

pub struct RunRegistry {
    inner: RwLock<RegistryInner>,
    run_ttl: std::time::Duration,
}

impl RunRegistry {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            run_ttl: config.run_ttl,
        }
    }

    pub fn generate_run_id(&self) -> RunId {
        RunId::new()
    }

    /// Registers a new run and returns its metadata.
    ///
    /// Rejects a run id that is already registered - double registration
    /// is a programming-contract violation, not a user-facing condition.
    pub fn register(&self, spec: &RunSpec) -> Result<Run, RuntimeError> {
        let now = Utc::now();
        let ttl = spec.timeout.unwrap_or(self.run_ttl);
        let expires_at = now
            + ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::seconds(600));

        let run = Run {
            run_id: spec.run_id,
            session_key: spec.session_key.clone(),
            conversation_id: spec.conversation_id.clone(),
            execution_id: spec.execution_id.clone(),
            lane: spec.global_lane,
            source: spec.source,
            tenant_id: spec.tenant_id.clone(),
            user_id: spec.user_id.clone(),
            started_at: now,
            expires_at,
            token: spec.token.clone(),
        };

        let mut inner = self.inner.write();
        if inner.runs.contains_key(&spec.run_id) {
            return Err(RuntimeError::DuplicateRun(spec.run_id));
        }

        inner.runs.insert(spec.run_id, run.clone());
        inner
            .by_session
            .entry(spec.session_key.clone())
            .or_default()
            .push(spec.run_id);
        inner
            .by_conversation
            .entry(spec.conversation_id.clone())
            .or_default()
            .push(spec.run_id);

        debug!(run_id = %spec.run_id, session_key = %spec.session_key, "Registered run");
        Ok(run)
    }

    /// Removes a run from all indices. No-op if the id is absent, so
    /// double settlement stays harmless.
    pub fn unregister(&self, run_id: RunId) -> bool {
        let mut inner = self.inner.write();
        Self::remove_locked(&mut inner, run_id)
    }

    fn remove_locked(inner: &mut RegistryInner, run_id: RunId) -> bool {
        let Some(run) = inner.runs.remove(&run_id) else {
            return false;
        };

        if let Some(ids) = inner.by_session.get_mut(&run.session_key) {
            ids.retain(|id| *id != run_id);
            if ids.is_empty() {
                inner.by_session.remove(&run.session_key);
            }
        }
        if let Some(ids) = inner.by_conversation.get_mut(&run.conversation_id) {
            ids.retain(|id| *id != run_id);
            if ids.is_empty() {
                inner.by_conversation.remove(&run.conversation_id);
            }
        }

        debug!(run_id = %run_id, "Completed run");
        true
    }

    pub fn get_run(&self, run_id: RunId) -> Option<Run> {
        self.inner.read().runs.get(&run_id).cloned()
    }

    pub fn get_runs_by_conversation(&self, conversation_id: &str) -> Vec<Run> {
        let inner = self.inner.read();
        let Some(ids) = inner.by_conversation.get(conversation_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| inner.runs.get(id).cloned())
            .collect()
    }

    pub fn get_runs_by_session(&self, session_key: &str) -> Vec<Run> {
        let inner = self.inner.read();
        let Some(ids) = inner.by_session.get(session_key) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| inner.runs.get(id).cloned())
            .collect()
    }

    /// Cancels the run's handle (skipping an already-cancelled one) and
    /// unregisters it. Returns whether the run was registered.
    pub fn abort_by_run_id(&self, run_id: RunId, reason: &str) -> bool {
        let mut inner = self.inner.write();
        let Some(run) = inner.runs.get(&run_id) else {
            return false;
        };
        if !run.token.is_cancelled() {
            info!(run_id = %run_id, reason = %reason, "Aborting run");
            run.token.cancel();
        }
        Self::remove_locked(&mut inner, run_id)
    }

    /// Aborts every active run of a conversation; returns the ids actually
    /// aborted. An immediate second call returns an empty list.
    pub fn abort_by_conversation(&self, conversation_id: &str, reason: &str) -> Vec<RunId> {
        let ids: Vec<RunId> = {
            let inner = self.inner.read();
            inner
                .by_conversation
                .get(conversation_id)
                .cloned()
                .unwrap_or_default()
        };

        let aborted: Vec<RunId> = ids
            .into_iter()
            .filter(|id| self.abort_by_run_id(*id, reason))
            .collect();
        if !aborted.is_empty() {
            info!(
                conversation_id = %conversation_id,
                count = aborted.len(),
                "Aborted runs for conversation"
            );
        }
        aborted
    }

    /// Same pattern keyed by session.
    pub fn abort_by_session_key(&self, session_key: &str, reason: &str) -> Vec<RunId> {
        let ids: Vec<RunId> = {
            let inner = self.inner.read();
            inner
                .by_session
                .get(session_key)
                .cloned()
                .unwrap_or_default()
        };

        let aborted: Vec<RunId> = ids
            .into_iter()
            .filter(|id| self.abort_by_run_id(*id, reason))
            .collect();
        if !aborted.is_empty() {
            info!(
                session_key = %session_key,
                count = aborted.len(),
                "Aborted runs for session"
            );
        }
        aborted
    }

    /// Aborts and unregisters runs whose deadline passed. Returns the
    /// number swept.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<RunId> = {
            let inner = self.inner.read();
            inner
                .runs
                .values()
                .filter(|run| run.expires_at < now)
                .map(|run| run.run_id)
                .collect()
        };

        let mut swept = 0;
        for run_id in expired {
            if self.abort_by_run_id(run_id, "Run expired") {
                swept += 1;
            }
        }
        if swept > 0 {
            info!(swept, "Swept expired runs");
        }
        swept
    }

    /// Aborts and unregisters every remaining run, so no task is left
    /// unresolved when the process exits.
    pub fn shutdown(&self, reason: &str) -> usize {
        let ids: Vec<RunId> = self.inner.read().runs.keys().copied().collect();
        let mut aborted = 0;
        for run_id in ids {
            if self.abort_by_run_id(run_id, reason) {
                aborted += 1;
            }
        }
        if aborted > 0 {
            info!(aborted, reason = %reason, "Aborted remaining runs on shutdown");
        }
        aborted
    }

    pub fn all_runs(&self) -> Vec<Run> {
        self.inner.read().runs.values().cloned().collect()
    }

    pub fn run_count(&self) -> usize {
        self.inner.read().runs.len()
    }

    pub fn run_count_by_lane(&self, lane: LaneName) -> usize {
        self.inner
            .read()
            .runs
            .values()
            .filter(|run| run.lane == lane)
            .count()
    }

    pub fn run_count_by_source(&self, source: RunSource) -> usize {
        self.inner
            .read()
            .runs
            .values()
            .filter(|run| run.source == source)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn registry() -> RunRegistry {
        RunRegistry::new(&RuntimeConfig::default())
    }

    fn spec(session_key: &str, conversation_id: &str) -> RunSpec {
        RunSpec::new(RunId::new(), session_key, conversation_id)
    }

    #[test]
    fn register_indexes_all_three_ways() {
        let registry = registry();
        let spec = spec("s1", "c1");
        registry.register(&spec).unwrap();

        assert!(registry.get_run(spec.run_id).is_some());
        assert_eq!(registry.get_runs_by_conversation("c1").len(), 1);
        assert_eq!(registry.get_runs_by_session("s1").len(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = registry();
        let spec = spec("s1", "c1");
        registry.register(&spec).unwrap();
        assert!(matches!(
            registry.register(&spec),
            Err(RuntimeError::DuplicateRun(_))
        ));
    }

    #[test]
    fn unregister_clears_every_index() {
        let registry = registry();
        let spec = spec("s1", "c1");
        registry.register(&spec).unwrap();

        assert!(registry.unregister(spec.run_id));
        assert!(registry.get_run(spec.run_id).is_none());
        assert!(registry.get_runs_by_conversation("c1").is_empty());
        assert!(registry.get_runs_by_session("s1").is_empty());

        // Idempotent cleanup on double settlement.
        assert!(!registry.unregister(spec.run_id));
    }

    #[test]
    fn abort_by_conversation_cancels_and_unregisters() {
        let registry = registry();
        let spec = spec("s1", "c1");
        registry.register(&spec).unwrap();

        let aborted = registry.abort_by_conversation("c1", "User canceled");
        assert_eq!(aborted, vec![spec.run_id]);
        assert!(spec.token.is_cancelled());

        // Second call finds nothing.
        assert!(registry.abort_by_conversation("c1", "again").is_empty());
    }

    #[test]
    fn abort_by_session_key_only_touches_that_session() {
        let registry = registry();
        let first = spec("s1", "c1");
        let second = spec("s2", "c1");
        registry.register(&first).unwrap();
        registry.register(&second).unwrap();

        let aborted = registry.abort_by_session_key("s1", "User canceled");
        assert_eq!(aborted, vec![first.run_id]);
        assert!(!second.token.is_cancelled());
        assert_eq!(registry.run_count(), 1);
    }

    #[test]
    fn sweep_removes_expired_runs() {
        let registry = registry();
        let expired = spec("s1", "c1").with_timeout(Duration::ZERO);
        let live = spec("s2", "c2");
        registry.register(&expired).unwrap();
        registry.register(&live).unwrap();

        assert_eq!(registry.sweep_expired(), 1);
        assert!(expired.token.is_cancelled());
        assert!(registry.get_run(live.run_id).is_some());
    }

    #[test]
    fn shutdown_aborts_everything() {
        let registry = registry();
        let first = spec("s1", "c1");
        let second = spec("s2", "c2");
        registry.register(&first).unwrap();
        registry.register(&second).unwrap();

        assert_eq!(registry.shutdown("Runtime shutdown"), 2);
        assert!(first.token.is_cancelled());
        assert!(second.token.is_cancelled());
        assert_eq!(registry.run_count(), 0);
    }

    #[test]
    fn counts_by_lane_and_source() {
        let registry = registry();
        registry
            .register(&spec("s1", "c1").with_lane(LaneName::Cron))
            .unwrap();
        registry
            .register(&spec("s2", "c2").with_source(RunSource::Handoff))
            .unwrap();

        assert_eq!(registry.run_count_by_lane(LaneName::Cron), 1);
        assert_eq!(registry.run_count_by_lane(LaneName::Main), 1);
        assert_eq!(registry.run_count_by_source(RunSource::Handoff), 1);
        assert_eq!(registry.run_count_by_source(RunSource::Chat), 1);
    }
}
