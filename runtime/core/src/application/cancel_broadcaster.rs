// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Distributed cancel broadcaster
//!
//! Any process in the fleet can request cancellation of a run whose
//! cancellation handle lives in a different process. Requests fan out on
//! the shared broadcast channel and are applied locally by whichever
//! process holds the handle. Delivery is best-effort / at-least-once, so
//! every application path here is idempotent; unknown ids are no-ops.
//!
//! The broadcaster keeps its own handle map for call sites that register
//! an execution id directly (bypassing the queue); it does not own the
//! run registry's entries.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::cancellation::{CancelTransport, CancellationPayload};

const TOMBSTONE_CAP: usize = 1024;

/// Remembers recently-cancelled execution ids so a cancellation that
/// raced ahead of registration still lands. Bounded FIFO.
#[derive(Default)]
struct TombstoneSet {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl TombstoneSet {
    fn insert(&mut self, id: String) {
        if !self.ids.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > TOMBSTONE_CAP {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
    }

    fn take(&mut self, id: &str) -> bool {
        if !self.ids.remove(id) {
            return false;
        }
        self.order.retain(|existing| existing != id);
        true
    }
}

pub struct DistributedCancelBroadcaster {
    transport: Arc<dyn CancelTransport>,
    handles: DashMap<String, CancellationToken>,
    tombstones: Mutex<TombstoneSet>,
    shutdown_token: CancellationToken,
}

impl DistributedCancelBroadcaster {
    pub fn new(transport: Arc<dyn CancelTransport>) -> Self {
        Self {
            transport,
            handles: DashMap::new(),
            tombstones: Mutex::new(TombstoneSet::default()),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Registers a cancellation handle under an execution id.
    ///
    /// If a cancellation for this id already arrived, the handle is
    /// cancelled immediately and not retained.
    pub fn register(&self, execution_id: impl Into<String>, token: CancellationToken) {
        let execution_id = execution_id.into();
        if self.tombstones.lock().take(&execution_id) {
            info!(
                execution_id = %execution_id,
                "Execution was cancelled before registration"
            );
            token.cancel();
            return;
        }
        self.handles.insert(execution_id, token);
    }

    /// No-op if the id is absent.
    pub fn unregister(&self, execution_id: &str) -> bool {
        self.handles.remove(execution_id).is_some()
    }

    pub fn registered_count(&self) -> usize {
        self.handles.len()
    }

    /// Publishes a cancellation for the given execution ids and applies it
    /// locally. Returns the ids whose handles lived in this process.
    ///
    /// An empty id list is a no-op: nothing is published. A transport
    /// failure is logged and degraded - cancelling runs in this process
    /// takes priority over guaranteed cross-process delivery.
    pub async fn cancel_executions(
        &self,
        execution_ids: &[String],
        reason: Option<&str>,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = execution_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        if ids.is_empty() {
            return Vec::new();
        }

        let payload = CancellationPayload::new(ids, reason.map(str::to_owned));
        if let Err(err) = self.transport.publish(&payload).await {
            warn!(
                channel = %self.transport.channel(),
                error = %err,
                "Failed to publish cancellation, applying locally only"
            );
        }

        self.apply(&payload)
    }

    /// Applies a payload against the local handle map. Idempotent: handles
    /// already cancelled or already removed are skipped; unknown ids are
    /// tombstoned in case their registration is still in flight.
    fn apply(&self, payload: &CancellationPayload) -> Vec<String> {
        let mut aborted = Vec::new();
        for execution_id in &payload.execution_ids {
            match self.handles.remove(execution_id) {
                Some((_, token)) => {
                    if !token.is_cancelled() {
                        token.cancel();
                    }
                    aborted.push(execution_id.clone());
                }
                None => {
                    self.tombstones.lock().insert(execution_id.clone());
                }
            }
        }

        if !aborted.is_empty() {
            info!(
                count = aborted.len(),
                reason = payload.reason.as_deref().unwrap_or("canceled"),
                "Cancelled local executions"
            );
        }
        aborted
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Starts the subscriber loop applying payloads from the channel.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let broadcaster = Arc::clone(self);
        tokio::spawn(async move {
            broadcaster.listen().await;
        })
    }

    async fn listen(&self) {
        let mut frames = self.transport.subscribe();
        debug!(channel = %self.transport.channel(), "Subscribed to cancellation channel");

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    debug!("Shutdown signal received, stopping cancel subscriber");
                    break;
                }
                frame = frames.next() => match frame {
                    Some(payload) => {
                        self.apply(&payload);
                    }
                    None => {
                        warn!("Cancellation channel closed");
                        break;
                    }
                }
            }
        }
    }
}
