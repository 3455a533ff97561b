// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Checkpoint contracts
//!
//! Read/write contract against the external checkpoint store, and the
//! durable-suspension contract built on top of it. The store's internal
//! format is not defined here; the core only needs addressable tuples
//! whose channel values can carry a serialized pending interrupt, so that
//! a different process can resume a suspended run from the checkpoint
//! alone.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::error::RuntimeError;
use crate::domain::message::{AgentMessage, AssistantMessage, ClientToolRequest, ToolCall};

/// Addresses one checkpoint in the external store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub thread_id: String,
    #[serde(default)]
    pub checkpoint_ns: String,
    #[serde(default)]
    pub checkpoint_id: Option<String>,
}

impl CheckpointConfig {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            checkpoint_ns: String::new(),
            checkpoint_id: None,
        }
    }
}

/// Persisted graph state snapshot. `channel_values` may carry a
/// `messages` sequence and a `summary` alongside arbitrary node channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub channel_values: HashMap<String, Value>,
}

impl Checkpoint {
    /// Message history recorded in the checkpoint, if present and well formed.
    pub fn messages(&self) -> Option<Vec<AgentMessage>> {
        let value = self.channel_values.get("messages")?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn summary(&self) -> Option<String> {
        match self.channel_values.get("summary") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub step: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointTuple {
    pub config: CheckpointConfig,
    pub checkpoint: Checkpoint,
    #[serde(default)]
    pub metadata: CheckpointMetadata,
}

impl CheckpointTuple {
    pub fn empty(config: CheckpointConfig) -> Self {
        Self {
            config,
            checkpoint: Checkpoint::default(),
            metadata: CheckpointMetadata::default(),
        }
    }
}

/// External checkpoint store.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Returns the addressed tuple, or `None` if no checkpoint exists.
    /// A config without `checkpoint_id` addresses the latest tuple for
    /// the thread/namespace pair.
    async fn get_tuple(
        &self,
        config: &CheckpointConfig,
    ) -> Result<Option<CheckpointTuple>, RuntimeError>;

    async fn put_tuple(&self, tuple: CheckpointTuple) -> Result<(), RuntimeError>;
}

/// Lifecycle of a durable interrupt.
///
/// `Running` is the implicit state while no interrupt is persisted;
/// a persisted interrupt moves `Suspended` -> `Resuming` -> `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuspensionPhase {
    Running,
    Suspended,
    Resuming,
    Done,
}

/// Durable token addressing one suspended interrupt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendToken {
    pub config: CheckpointConfig,
    pub interrupt_id: Uuid,
}

/// Everything needed to resume after a process restart, persisted at
/// suspension time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspendedInterrupt {
    pub id: Uuid,
    pub phase: SuspensionPhase,
    /// The assistant message whose tool calls triggered the suspension.
    pub assistant: AssistantMessage,
    pub request: ClientToolRequest,
    /// Tool calls that still need ordinary server-side execution.
    pub remaining_tool_calls: Vec<ToolCall>,
    pub suspended_at: DateTime<Utc>,
}

/// Durable suspension store: the only two entry points into the
/// suspended state are `suspend` and (via `load`/`complete`) resume.
#[async_trait]
pub trait DurableSuspension: Send + Sync {
    async fn suspend(
        &self,
        config: &CheckpointConfig,
        interrupt: SuspendedInterrupt,
    ) -> Result<SuspendToken, RuntimeError>;

    async fn load(&self, token: &SuspendToken) -> Result<SuspendedInterrupt, RuntimeError>;

    async fn mark(
        &self,
        token: &SuspendToken,
        phase: SuspensionPhase,
    ) -> Result<(), RuntimeError>;

    /// Clears the interrupt; the run is no longer suspended.
    async fn complete(&self, token: &SuspendToken) -> Result<(), RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_reads_summary_channel() {
        let mut checkpoint = Checkpoint::default();
        checkpoint
            .channel_values
            .insert("summary".into(), Value::from("condensed history"));
        assert_eq!(checkpoint.summary().as_deref(), Some("condensed history"));
        assert!(checkpoint.messages().is_none());
    }

    #[test]
    fn config_defaults_to_latest_checkpoint() {
        let config = CheckpointConfig::new("thread-1");
        assert!(config.checkpoint_id.is_none());
        assert!(config.checkpoint_ns.is_empty());
    }
}
