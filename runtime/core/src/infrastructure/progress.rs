// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Progress publishing over a broadcast channel
//!
//! Best-effort by contract: publishing to nobody succeeds silently, slow
//! subscribers drop events rather than exerting back-pressure.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::events::{NodeExecutionEvent, ProgressPublisher};

pub struct BroadcastProgressPublisher {
    sender: broadcast::Sender<NodeExecutionEvent>,
}

impl BroadcastProgressPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(256)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastProgressPublisher {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl ProgressPublisher for BroadcastProgressPublisher {
    fn publish(&self, event: NodeExecutionEvent) {
        if self.sender.send(event).is_err() {
            debug!("No subscribers listening for progress events");
        }
    }
}

/// For callers without a subscriber.
pub struct NoopProgressPublisher;

impl ProgressPublisher for NoopProgressPublisher {
    fn publish(&self, _event: NodeExecutionEvent) {}
}
