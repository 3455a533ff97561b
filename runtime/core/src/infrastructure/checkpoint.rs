// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Checkpoint store and checkpoint-backed suspension
//!
//! `InMemoryCheckpointer` keeps per-thread checkpoint history for tests
//! and single-node deployments; durable stores are external
//! collaborators behind the same trait. `CheckpointSuspension` persists a
//! pending interrupt into the checkpoint's channel values under a
//! reserved key, so a different process can resume the run by reading
//! the checkpoint alone.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::checkpoint::{
    CheckpointConfig, CheckpointTuple, Checkpointer, DurableSuspension, SuspendToken,
    SuspendedInterrupt, SuspensionPhase,
};
use crate::domain::error::RuntimeError;

/// Reserved channel key carrying the serialized pending interrupt.
pub const INTERRUPT_CHANNEL: &str = "__interrupt__";

#[derive(Default)]
pub struct InMemoryCheckpointer {
    // (thread_id, checkpoint_ns) -> checkpoint history, oldest first.
    threads: RwLock<HashMap<(String, String), Vec<CheckpointTuple>>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn get_tuple(
        &self,
        config: &CheckpointConfig,
    ) -> Result<Option<CheckpointTuple>, RuntimeError> {
        let threads = self.threads.read().await;
        let key = (config.thread_id.clone(), config.checkpoint_ns.clone());
        let Some(history) = threads.get(&key) else {
            return Ok(None);
        };

        let tuple = match &config.checkpoint_id {
            Some(checkpoint_id) => history
                .iter()
                .find(|tuple| tuple.config.checkpoint_id.as_ref() == Some(checkpoint_id)),
            None => history.last(),
        };
        Ok(tuple.cloned())
    }

    async fn put_tuple(&self, mut tuple: CheckpointTuple) -> Result<(), RuntimeError> {
        if tuple.config.checkpoint_id.is_none() {
            tuple.config.checkpoint_id = Some(Uuid::new_v4().to_string());
        }

        let mut threads = self.threads.write().await;
        let key = (
            tuple.config.thread_id.clone(),
            tuple.config.checkpoint_ns.clone(),
        );
        let history = threads.entry(key).or_default();
        match history
            .iter_mut()
            .find(|existing| existing.config.checkpoint_id == tuple.config.checkpoint_id)
        {
            Some(existing) => *existing = tuple,
            None => history.push(tuple),
        }
        Ok(())
    }
}

/// Durable suspension backed by the checkpoint store.
pub struct CheckpointSuspension {
    checkpointer: Arc<dyn Checkpointer>,
}

impl CheckpointSuspension {
    pub fn new(checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self { checkpointer }
    }

    async fn load_tuple(
        &self,
        config: &CheckpointConfig,
    ) -> Result<CheckpointTuple, RuntimeError> {
        self.checkpointer
            .get_tuple(config)
            .await?
            .ok_or_else(|| RuntimeError::not_found("checkpoint", config.thread_id.clone()))
    }

    fn read_interrupt(
        tuple: &CheckpointTuple,
        token: &SuspendToken,
    ) -> Result<SuspendedInterrupt, RuntimeError> {
        let value = tuple
            .checkpoint
            .channel_values
            .get(INTERRUPT_CHANNEL)
            .ok_or_else(|| {
                RuntimeError::not_found("suspended interrupt", token.interrupt_id.to_string())
            })?;
        let interrupt: SuspendedInterrupt = serde_json::from_value(value.clone())
            .map_err(|err| RuntimeError::validation(format!("corrupt interrupt state: {err}")))?;
        if interrupt.id != token.interrupt_id {
            // A newer suspension replaced this one; the token is stale.
            return Err(RuntimeError::not_found(
                "suspended interrupt",
                token.interrupt_id.to_string(),
            ));
        }
        Ok(interrupt)
    }
}

#[async_trait]
impl DurableSuspension for CheckpointSuspension {
    async fn suspend(
        &self,
        config: &CheckpointConfig,
        interrupt: SuspendedInterrupt,
    ) -> Result<SuspendToken, RuntimeError> {
        let interrupt_id = interrupt.id;
        let mut tuple = self
            .checkpointer
            .get_tuple(config)
            .await?
            .unwrap_or_else(|| CheckpointTuple::empty(config.clone()));

        let value = serde_json::to_value(&interrupt)
            .map_err(|err| RuntimeError::Internal(err.to_string()))?;
        tuple
            .checkpoint
            .channel_values
            .insert(INTERRUPT_CHANNEL.to_string(), value);
        self.checkpointer.put_tuple(tuple).await?;

        debug!(thread_id = %config.thread_id, interrupt_id = %interrupt_id, "Persisted interrupt");
        Ok(SuspendToken {
            config: config.clone(),
            interrupt_id,
        })
    }

    async fn load(&self, token: &SuspendToken) -> Result<SuspendedInterrupt, RuntimeError> {
        let tuple = self.load_tuple(&token.config).await?;
        Self::read_interrupt(&tuple, token)
    }

    async fn mark(
        &self,
        token: &SuspendToken,
        phase: SuspensionPhase,
    ) -> Result<(), RuntimeError> {
        let mut tuple = self.load_tuple(&token.config).await?;
        let mut interrupt = Self::read_interrupt(&tuple, token)?;
        interrupt.phase = phase;

        let value = serde_json::to_value(&interrupt)
            .map_err(|err| RuntimeError::Internal(err.to_string()))?;
        tuple
            .checkpoint
            .channel_values
            .insert(INTERRUPT_CHANNEL.to_string(), value);
        self.checkpointer.put_tuple(tuple).await
    }

    async fn complete(&self, token: &SuspendToken) -> Result<(), RuntimeError> {
        let mut tuple = self.load_tuple(&token.config).await?;
        // Validate ownership before clearing.
        Self::read_interrupt(&tuple, token)?;
        tuple.checkpoint.channel_values.remove(INTERRUPT_CHANNEL);
        self.checkpointer.put_tuple(tuple).await?;

        debug!(thread_id = %token.config.thread_id, "Cleared interrupt");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::{AssistantMessage, ClientToolRequest, ToolCall};
    use chrono::Utc;

    fn interrupt() -> SuspendedInterrupt {
        SuspendedInterrupt {
            id: Uuid::new_v4(),
            phase: SuspensionPhase::Suspended,
            assistant: AssistantMessage {
                content: String::new(),
                tool_calls: vec![ToolCall::new("t1", "clientTool")],
            },
            request: ClientToolRequest {
                client_tool_calls: vec![ToolCall::new("t1", "clientTool")],
            },
            remaining_tool_calls: vec![],
            suspended_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn get_tuple_returns_latest_without_checkpoint_id() {
        let checkpointer = InMemoryCheckpointer::new();
        let mut config = CheckpointConfig::new("thread-1");

        config.checkpoint_id = Some("first".into());
        checkpointer
            .put_tuple(CheckpointTuple::empty(config.clone()))
            .await
            .unwrap();
        config.checkpoint_id = Some("second".into());
        checkpointer
            .put_tuple(CheckpointTuple::empty(config))
            .await
            .unwrap();

        let latest = checkpointer
            .get_tuple(&CheckpointConfig::new("thread-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.config.checkpoint_id.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn missing_thread_yields_none() {
        let checkpointer = InMemoryCheckpointer::new();
        let tuple = checkpointer
            .get_tuple(&CheckpointConfig::new("missing"))
            .await
            .unwrap();
        assert!(tuple.is_none());
    }

    #[tokio::test]
    async fn suspend_load_complete_cycle() {
        let suspension = CheckpointSuspension::new(Arc::new(InMemoryCheckpointer::new()));
        let config = CheckpointConfig::new("thread-1");

        let token = suspension.suspend(&config, interrupt()).await.unwrap();
        let loaded = suspension.load(&token).await.unwrap();
        assert_eq!(loaded.phase, SuspensionPhase::Suspended);

        suspension
            .mark(&token, SuspensionPhase::Resuming)
            .await
            .unwrap();
        assert_eq!(
            suspension.load(&token).await.unwrap().phase,
            SuspensionPhase::Resuming
        );

        suspension.complete(&token).await.unwrap();
        assert!(matches!(
            suspension.load(&token).await,
            Err(RuntimeError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn stale_token_is_rejected() {
        let checkpointer = Arc::new(InMemoryCheckpointer::new());
        let suspension = CheckpointSuspension::new(checkpointer);
        let config = CheckpointConfig::new("thread-1");

        let stale = suspension.suspend(&config, interrupt()).await.unwrap();
        // A newer suspension on the same thread replaces the first.
        let fresh = suspension.suspend(&config, interrupt()).await.unwrap();

        assert!(matches!(
            suspension.load(&stale).await,
            Err(RuntimeError::NotFound { .. })
        ));
        assert!(suspension.load(&fresh).await.is_ok());
    }
}
