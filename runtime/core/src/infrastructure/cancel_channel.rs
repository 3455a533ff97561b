// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-process cancellation channel
//!
//! Tokio broadcast implementation of the cancel transport, used by tests
//! and single-node deployments. Frames cross the channel serialized, the
//! way they would cross a real fleet bus, and are schema-checked on the
//! way out: malformed frames are logged and dropped at the edge.

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::cancellation::{CancelFrameStream, CancelTransport, CancellationPayload};

pub struct InProcessCancelChannel {
    sender: broadcast::Sender<String>,
}

impl InProcessCancelChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Default capacity (256 frames).
    pub fn with_default_capacity() -> Self {
        Self::new(256)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InProcessCancelChannel {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl CancelTransport for InProcessCancelChannel {
    async fn publish(&self, payload: &CancellationPayload) -> anyhow::Result<()> {
        let frame =
            serde_json::to_string(payload).context("serializing cancellation payload")?;
        // send() only errors when nobody subscribes, which is fine here.
        if self.sender.send(frame).is_err() {
            debug!(channel = %self.channel(), "No subscribers on cancellation channel");
        }
        Ok(())
    }

    fn subscribe(&self) -> CancelFrameStream {
        let receiver = self.sender.subscribe();
        Box::pin(futures::stream::unfold(receiver, |mut receiver| async {
            loop {
                match receiver.recv().await {
                    Ok(frame) => match serde_json::from_str::<CancellationPayload>(&frame) {
                        Ok(payload) => return Some((payload, receiver)),
                        Err(err) => {
                            warn!(error = %err, "Dropping malformed cancellation frame");
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Cancellation subscriber lagged, frames dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }
}
