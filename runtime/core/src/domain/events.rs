// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Progress events
//!
//! Typed notifications emitted around workflow-node executions. Publishing
//! is best-effort: no delivery guarantee, no back-pressure, and an absent
//! subscriber is not an error.

use serde::{Deserialize, Serialize};

use crate::domain::execution_record::ExecutionRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeExecutionEvent {
    NodeStarted { execution: ExecutionRecord },
    NodeCompleted { execution: ExecutionRecord },
    NodeFailed { execution: ExecutionRecord, error: String },
}

impl NodeExecutionEvent {
    pub fn execution(&self) -> &ExecutionRecord {
        match self {
            NodeExecutionEvent::NodeStarted { execution }
            | NodeExecutionEvent::NodeCompleted { execution }
            | NodeExecutionEvent::NodeFailed { execution, .. } => execution,
        }
    }
}

/// Fire-and-forget publish interface for progress events.
pub trait ProgressPublisher: Send + Sync {
    fn publish(&self, event: NodeExecutionEvent);
}
