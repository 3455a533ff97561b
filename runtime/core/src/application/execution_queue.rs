// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Execution queue - two-gate run scheduling
//!
//! Gate 1: session lane - tasks sharing a session key execute strictly in
//! submission order, one at a time.
//! Gate 2: global lane - overall concurrency is bounded per lane type.
//!
//! Runs are registered with the registry at admission and unregistered
//! exactly once when the task settles, on every exit path. Cancellation
//! of a queued run skips its task body entirely; cancellation of a
//! running task only raises the token - tasks observe it cooperatively,
//! the queue never forcibly terminates in-flight work.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, warn};

use crate::application::config::RuntimeConfig;
use crate::application::run_registry::RunRegistry;
use crate::domain::error::RuntimeError;
use crate::domain::run::{LaneName, RunId, RunSpec};

struct SessionEntry {
    run_id: RunId,
    job: Pin<Box<dyn Future<Output = ()> + Send>>,
}

#[derive(Default)]
struct SessionLane {
    active: bool,
    queue: VecDeque<SessionEntry>,
}

type SessionLanes = Arc<Mutex<HashMap<String, SessionLane>>>;

/// Point-in-time statistics for one global lane.
#[derive(Debug, Clone, Serialize)]
pub struct LaneStats {
    pub lane: LaneName,
    pub max_concurrent: usize,
    pub active: usize,
}

pub struct ExecutionQueue {
    registry: Arc<RunRegistry>,
    lanes: HashMap<LaneName, Arc<Semaphore>>,
    session_lanes: SessionLanes,
    config: RuntimeConfig,
    draining: AtomicBool,
}

/// Unregisters the run when the settlement scope exits, whichever way it
/// exits - including the caller dropping the `run` future mid-await.
struct SettlementGuard<'a> {
    registry: &'a RunRegistry,
    run_id: RunId,
}

impl Drop for SettlementGuard<'_> {
    fn drop(&mut self) {
        self.registry.unregister(self.run_id);
    }
}

impl ExecutionQueue {
    pub fn new(registry: Arc<RunRegistry>, config: RuntimeConfig) -> Self {
        let lanes = LaneName::ALL
            .iter()
            .map(|lane| {
                (
                    *lane,
                    Arc::new(Semaphore::new(config.lanes.for_lane(*lane))),
                )
            })
            .collect();

        Self {
            registry,
            lanes,
            session_lanes: Arc::new(Mutex::new(HashMap::new())),
            config,
            draining: AtomicBool::new(false),
        }
    }

    /// Admits a run and resolves to its task's result.
    ///
    /// The task must observe `spec.token` itself to stop early; the queue
    /// only guarantees the body never starts once the token is cancelled.
    pub async fn run<T, F>(&self, spec: RunSpec, task: F) -> Result<T, RuntimeError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, RuntimeError>> + Send + 'static,
    {
        if self.draining.load(Ordering::SeqCst) {
            return Err(RuntimeError::Draining);
        }
        if spec.token.is_cancelled() {
            return Err(RuntimeError::aborted("Execution aborted before start"));
        }

        let lane = self
            .lanes
            .get(&spec.global_lane)
            .cloned()
            .unwrap_or_else(|| Arc::new(Semaphore::new(1)));

        self.registry.register(&spec)?;
        let guard = SettlementGuard {
            registry: self.registry.as_ref(),
            run_id: spec.run_id,
        };

        let (tx, rx) = oneshot::channel::<Result<T, RuntimeError>>();
        let token = spec.token.clone();
        let run_id = spec.run_id;
        let lane_name = spec.global_lane;
        let warn_after = self.config.queue_wait_warn;
        let enqueued_at = Instant::now();

        let job: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async move {
            // Skip entirely if cancelled while queued.
            if token.is_cancelled() {
                let _ = tx.send(Err(RuntimeError::aborted("Task aborted while queued")));
                return;
            }

            let waited = enqueued_at.elapsed();
            if waited > warn_after {
                warn!(
                    run_id = %run_id,
                    lane = %lane_name,
                    waited_ms = waited.as_millis() as u64,
                    "Task waited in queue"
                );
            }

            let permit = tokio::select! {
                _ = token.cancelled() => None,
                permit = lane.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit else {
                let _ = tx.send(Err(RuntimeError::aborted(
                    "Task aborted while awaiting lane capacity",
                )));
                return;
            };

            let result = task.await;
            let _ = tx.send(result);
        });

        self.enqueue_session(
            &spec.session_key,
            SessionEntry {
                run_id: spec.run_id,
                job,
            },
        );

        let result = match rx.await {
            Ok(result) => result,
            // The entry was dropped without running (queue drained).
            Err(_) => Err(RuntimeError::aborted("Run queue drained")),
        };

        drop(guard);
        result
    }

    fn enqueue_session(&self, session_key: &str, entry: SessionEntry) {
        let mut lanes = self.session_lanes.lock();
        let lane = lanes.entry(session_key.to_string()).or_default();
        debug!(run_id = %entry.run_id, session_key = %session_key, "Enqueued run in session lane");
        lane.queue.push_back(entry);

        if !lane.active {
            lane.active = true;
            let session_lanes = Arc::clone(&self.session_lanes);
            let key = session_key.to_string();
            tokio::spawn(drive_session(session_lanes, key));
        }
    }

    /// Stops admissions and rejects everything still queued. Running
    /// tasks are left to settle through their cancellation tokens.
    pub fn drain(&self) {
        self.draining.store(true, Ordering::SeqCst);
        let cleared: usize = {
            let mut lanes = self.session_lanes.lock();
            lanes.values_mut().map(|lane| {
                let n = lane.queue.len();
                lane.queue.clear();
                n
            }).sum()
        };
        if cleared > 0 {
            warn!(cleared, "Cleared queued tasks while draining");
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn session_queue_depth(&self, session_key: &str) -> usize {
        self.session_lanes
            .lock()
            .get(session_key)
            .map(|lane| lane.queue.len())
            .unwrap_or(0)
    }

    pub fn active_session_keys(&self) -> Vec<String> {
        self.session_lanes.lock().keys().cloned().collect()
    }

    pub fn lane_stats(&self, lane: LaneName) -> LaneStats {
        let max_concurrent = self.config.lanes.for_lane(lane);
        let available = self
            .lanes
            .get(&lane)
            .map(|sem| sem.available_permits())
            .unwrap_or(0);
        LaneStats {
            lane,
            max_concurrent,
            active: max_concurrent.saturating_sub(available),
        }
    }

    pub fn all_lane_stats(&self) -> Vec<LaneStats> {
        LaneName::ALL
            .iter()
            .map(|lane| self.lane_stats(*lane))
            .collect()
    }
}

/// Drains one session lane serially; exactly one driver exists per lane.
/// The lane is removed once its queue runs dry.
async fn drive_session(session_lanes: SessionLanes, session_key: String) {
    loop {
        let entry = {
            let mut lanes = session_lanes.lock();
            let Some(lane) = lanes.get_mut(&session_key) else {
                return;
            };
            match lane.queue.pop_front() {
                Some(entry) => entry,
                None => {
                    lanes.remove(&session_key);
                    return;
                }
            }
        };
        entry.job.await;
    }
}
