// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cancellation wire contract
//!
//! The fleet shares a single well-known broadcast channel for
//! cancellation requests. Delivery is at-least-once and unordered;
//! handlers must be idempotent and treat unknown execution ids as no-ops.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

/// Logical channel cancellation frames are published on.
pub const CANCEL_CHANNEL: &str = "ai:execution:cancel";

/// Payload broadcast on the cancellation channel. Transient: exists only
/// on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPayload {
    /// Deduplicated, order-preserving.
    pub execution_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CancellationPayload {
    pub fn new(execution_ids: Vec<String>, reason: Option<String>) -> Self {
        Self {
            execution_ids,
            reason,
        }
    }
}

pub type CancelFrameStream = Pin<Box<dyn Stream<Item = CancellationPayload> + Send>>;

/// Cross-process broadcast capability carrying cancellation frames.
///
/// Any transport satisfying at-least-once delivery works (pub/sub,
/// broadcast queue, gossip). Subscribers receive only frames that passed
/// schema validation; malformed frames are dropped at the edge.
#[async_trait]
pub trait CancelTransport: Send + Sync {
    fn channel(&self) -> &str {
        CANCEL_CHANNEL
    }

    async fn publish(&self, payload: &CancellationPayload) -> anyhow::Result<()>;

    fn subscribe(&self) -> CancelFrameStream;
}
