// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Execution records
//!
//! One persisted entry per side-effecting workflow-node operation.
//! Records are owned by the node-execution wrapper: created once at the
//! start of an operation, moved to a terminal status when it settles,
//! never mutated concurrently for the same id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionRecordId(pub Uuid);

impl ExecutionRecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Success,
    Failed,
    /// Terminal status of an aborted run; reported as stopped, not failed.
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionRecordId,
    pub tenant_id: String,
    pub organization_id: Option<String>,
    /// Coarse grouping, e.g. "workflow" or "agent".
    pub category: String,
    /// Node type within the category, e.g. "code" or "iterating".
    pub kind: String,
    pub inputs: Value,
    /// Links sub-executions to their parent run's record.
    pub parent_id: Option<ExecutionRecordId>,
    pub thread_id: Option<String>,
    pub checkpoint_ns: Option<String>,
    pub checkpoint_id: Option<String>,
    pub agent_key: Option<String>,
    pub title: Option<String>,
    pub status: ExecutionStatus,
    pub error: Option<String>,
    pub elapsed_ms: Option<i64>,
    pub total_tokens: Option<i64>,
    pub outputs: Option<Value>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied when an operation settles.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRecordPatch {
    pub status: Option<ExecutionStatus>,
    pub error: Option<String>,
    pub elapsed_ms: Option<i64>,
    pub total_tokens: Option<i64>,
    pub outputs: Option<Value>,
    pub summary: Option<String>,
    pub checkpoint_id: Option<String>,
}

impl ExecutionRecord {
    pub fn apply(&mut self, patch: ExecutionRecordPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
        if let Some(elapsed_ms) = patch.elapsed_ms {
            self.elapsed_ms = Some(elapsed_ms);
        }
        if let Some(total_tokens) = patch.total_tokens {
            self.total_tokens = Some(total_tokens);
        }
        if let Some(outputs) = patch.outputs {
            self.outputs = Some(outputs);
        }
        if let Some(summary) = patch.summary {
            self.summary = Some(summary);
        }
        if let Some(checkpoint_id) = patch.checkpoint_id {
            self.checkpoint_id = Some(checkpoint_id);
        }
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, ExecutionStatus::Pending)
    }
}
