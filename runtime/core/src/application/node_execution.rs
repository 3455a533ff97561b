// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow-node execution wrapper
//!
//! Uniform recording around any side-effecting workflow-node operation: a
//! record is persisted before the operation runs and moved to a terminal
//! status when it settles. The wrapper never swallows errors - failure
//! handling stays with the caller - and progress notifications are
//! fire-and-forget.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use crate::domain::error::RuntimeError;
use crate::domain::events::{NodeExecutionEvent, ProgressPublisher};
use crate::domain::execution_record::{
    ExecutionRecord, ExecutionRecordId, ExecutionRecordPatch, ExecutionStatus,
};
use crate::domain::repository::{ExecutionRecordRepository, RecordScope};

/// Channel key a node's output state merges into.
pub fn channel_name(key: &str) -> String {
    format!("{}_channel", key.to_lowercase())
}

/// Metadata persisted with the execution record.
#[derive(Debug, Clone)]
pub struct NodeExecutionMetadata {
    pub tenant_id: String,
    pub organization_id: Option<String>,
    pub category: String,
    pub kind: String,
    pub node_key: String,
    pub title: Option<String>,
    pub agent_key: Option<String>,
    pub parent_id: Option<ExecutionRecordId>,
    pub thread_id: Option<String>,
    pub checkpoint_ns: Option<String>,
    pub checkpoint_id: Option<String>,
    pub inputs: Value,
}

/// State delta a wrapped operation contributes to the graph, keyed by the
/// node's channel.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub channel: String,
    pub value: Value,
}

pub struct NodeExecutionWrapper {
    repository: Arc<dyn ExecutionRecordRepository>,
    progress: Arc<dyn ProgressPublisher>,
}

impl NodeExecutionWrapper {
    pub fn new(
        repository: Arc<dyn ExecutionRecordRepository>,
        progress: Arc<dyn ProgressPublisher>,
    ) -> Self {
        Self {
            repository,
            progress,
        }
    }

    /// Runs `operation` with uniform recording.
    ///
    /// On success the record turns `Success` and the operation's output
    /// state is returned keyed by the node's channel. On error the record
    /// turns `Failed` (or `Cancelled` for an aborted run) and the error
    /// propagates unchanged.
    pub async fn wrap<F, Fut>(
        &self,
        meta: NodeExecutionMetadata,
        operation: F,
    ) -> Result<StateUpdate, RuntimeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, RuntimeError>>,
    {
        let scope = RecordScope {
            tenant_id: meta.tenant_id.clone(),
            organization_id: meta.organization_id.clone(),
        };

        let now = Utc::now();
        let record = ExecutionRecord {
            id: ExecutionRecordId::new(),
            tenant_id: meta.tenant_id.clone(),
            organization_id: meta.organization_id.clone(),
            category: meta.category.clone(),
            kind: meta.kind.clone(),
            inputs: meta.inputs.clone(),
            parent_id: meta.parent_id,
            thread_id: meta.thread_id.clone(),
            checkpoint_ns: meta.checkpoint_ns.clone(),
            checkpoint_id: meta.checkpoint_id.clone(),
            agent_key: meta.agent_key.clone(),
            title: meta.title.clone(),
            status: ExecutionStatus::Pending,
            error: None,
            elapsed_ms: None,
            total_tokens: None,
            outputs: None,
            summary: None,
            created_at: now,
            updated_at: now,
        };
        let record = self.repository.create(record).await?;
        let record_id = record.id;
        self.progress.publish(NodeExecutionEvent::NodeStarted {
            execution: record,
        });

        let started = Instant::now();
        match operation().await {
            Ok(outputs) => {
                let patch = ExecutionRecordPatch {
                    status: Some(ExecutionStatus::Success),
                    elapsed_ms: Some(started.elapsed().as_millis() as i64),
                    outputs: Some(outputs.clone()),
                    ..Default::default()
                };
                let updated = self.repository.update(&scope, record_id, patch).await?;
                self.progress.publish(NodeExecutionEvent::NodeCompleted {
                    execution: updated,
                });

                Ok(StateUpdate {
                    channel: channel_name(&meta.node_key),
                    value: outputs,
                })
            }
            Err(err) => {
                let status = if err.is_aborted() {
                    ExecutionStatus::Cancelled
                } else {
                    ExecutionStatus::Failed
                };
                let patch = ExecutionRecordPatch {
                    status: Some(status),
                    error: Some(err.to_string()),
                    elapsed_ms: Some(started.elapsed().as_millis() as i64),
                    ..Default::default()
                };
                match self.repository.update(&scope, record_id, patch).await {
                    Ok(updated) => {
                        self.progress.publish(NodeExecutionEvent::NodeFailed {
                            execution: updated,
                            error: err.to_string(),
                        });
                    }
                    Err(update_err) => {
                        warn!(
                            record_id = %record_id,
                            error = %update_err,
                            "Failed to record node execution failure"
                        );
                    }
                }
                Err(err)
            }
        }
    }
}
