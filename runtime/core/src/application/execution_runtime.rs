// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Execution runtime facade
//!
//! Composes the run registry, the execution queue and the distributed
//! cancel broadcaster behind one surface, so callers can submit work and
//! abort it by conversation, session key or run id without knowing which
//! collaborator holds the handle. Holds no state of its own.

use std::future::Future;
use std::sync::Arc;

use crate::application::cancel_broadcaster::DistributedCancelBroadcaster;
use crate::application::execution_queue::{ExecutionQueue, LaneStats};
use crate::application::run_registry::RunRegistry;
use crate::application::session_key::SessionKeyResolver;
use crate::domain::error::RuntimeError;
use crate::domain::run::{LaneName, Run, RunId, RunSpec};

pub struct ExecutionRuntime {
    registry: Arc<RunRegistry>,
    queue: Arc<ExecutionQueue>,
    broadcaster: Arc<DistributedCancelBroadcaster>,
    resolver: SessionKeyResolver,
}

impl ExecutionRuntime {
    pub fn new(
        registry: Arc<RunRegistry>,
        queue: Arc<ExecutionQueue>,
        broadcaster: Arc<DistributedCancelBroadcaster>,
    ) -> Self {
        Self {
            registry,
            queue,
            broadcaster,
            resolver: SessionKeyResolver,
        }
    }

    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<DistributedCancelBroadcaster> {
        &self.broadcaster
    }

    pub fn resolver(&self) -> &SessionKeyResolver {
        &self.resolver
    }

    pub fn generate_run_id(&self) -> RunId {
        self.registry.generate_run_id()
    }

    /// Submits a task through the two-gate queue.
    pub async fn run<T, F>(&self, spec: RunSpec, task: F) -> Result<T, RuntimeError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, RuntimeError>> + Send + 'static,
    {
        self.queue.run(spec, task).await
    }

    pub fn abort_by_run_id(&self, run_id: RunId, reason: &str) -> bool {
        self.registry.abort_by_run_id(run_id, reason)
    }

    pub fn abort_by_session_key(&self, session_key: &str, reason: &str) -> Vec<RunId> {
        self.registry.abort_by_session_key(session_key, reason)
    }

    pub fn abort_by_conversation(&self, conversation_id: &str, reason: &str) -> Vec<RunId> {
        self.registry.abort_by_conversation(conversation_id, reason)
    }

    pub fn get_run(&self, run_id: RunId) -> Option<Run> {
        self.registry.get_run(run_id)
    }

    pub fn get_runs_by_conversation(&self, conversation_id: &str) -> Vec<Run> {
        self.registry.get_runs_by_conversation(conversation_id)
    }

    pub fn get_runs_by_session(&self, session_key: &str) -> Vec<Run> {
        self.registry.get_runs_by_session(session_key)
    }

    pub fn run_count(&self) -> usize {
        self.registry.run_count()
    }

    pub fn lane_stats(&self, lane: LaneName) -> LaneStats {
        self.queue.lane_stats(lane)
    }

    pub fn all_lane_stats(&self) -> Vec<LaneStats> {
        self.queue.all_lane_stats()
    }

    pub fn session_queue_depth(&self, session_key: &str) -> usize {
        self.queue.session_queue_depth(session_key)
    }

    /// Stops admissions and aborts every remaining run.
    pub fn shutdown(&self, reason: &str) -> usize {
        self.queue.drain();
        self.registry.shutdown(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::RuntimeConfig;
    use crate::infrastructure::cancel_channel::InProcessCancelChannel;

    fn runtime() -> ExecutionRuntime {
        let config = RuntimeConfig::default();
        let registry = Arc::new(RunRegistry::new(&config));
        let queue = Arc::new(ExecutionQueue::new(registry.clone(), config));
        let broadcaster = Arc::new(DistributedCancelBroadcaster::new(Arc::new(
            InProcessCancelChannel::with_default_capacity(),
        )));
        ExecutionRuntime::new(registry, queue, broadcaster)
    }

    #[tokio::test]
    async fn facade_delegates_run_and_lookup() {
        let runtime = runtime();
        let spec = RunSpec::new(runtime.generate_run_id(), "s1", "c1");
        runtime
            .run(spec, async { Ok::<_, RuntimeError>(()) })
            .await
            .unwrap();
        assert_eq!(runtime.run_count(), 0);
        assert!(runtime.get_runs_by_conversation("c1").is_empty());
    }

    #[tokio::test]
    async fn shutdown_rejects_later_admissions() {
        let runtime = runtime();
        runtime.shutdown("Runtime shutdown");
        let spec = RunSpec::new(runtime.generate_run_id(), "s1", "c1");
        let result = runtime.run(spec, async { Ok::<_, RuntimeError>(()) }).await;
        assert!(matches!(result, Err(RuntimeError::Draining)));
    }
}
