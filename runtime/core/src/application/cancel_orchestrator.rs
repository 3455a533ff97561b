// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cancel orchestrator - command-level entry point for stopping runs
//!
//! A cancel request may target a run whose handle lives in this process,
//! in another process, or nowhere (already finished). Three strategies
//! run in sequence and their results are aggregated without
//! double-counting; finding nothing anywhere is a success with empty
//! lists, never an error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::execution_runtime::ExecutionRuntime;
use crate::domain::run::RunId;

/// Cancel command input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRunCommand {
    pub conversation_id: String,
    #[serde(default)]
    pub run_id: Option<RunId>,
    pub tenant_id: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    pub user_id: String,
}

/// Cancel command output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    pub aborted_run_ids: Vec<RunId>,
    pub aborted_execution_ids: Vec<String>,
}

pub struct CancelOrchestrator {
    runtime: Arc<ExecutionRuntime>,
}

impl CancelOrchestrator {
    pub fn new(runtime: Arc<ExecutionRuntime>) -> Self {
        Self { runtime }
    }

    /// Tries each cancellation strategy in turn:
    ///
    /// 1. abort by conversation through the runtime's registry;
    /// 2. broadcast-cancel the execution ids those runs carried, covering
    ///    executions registered directly with the broadcaster;
    /// 3. abort by derived session key(s), catching runs admitted under a
    ///    session the conversation lookup does not know about.
    pub async fn cancel(&self, command: &CancelRunCommand) -> CancelOutcome {
        let reason = format!("Canceled by user {}", command.user_id);

        // Snapshot before strategy 1 unregisters the runs it aborts -
        // strategy 2 still needs their execution ids.
        let runs = self
            .runtime
            .get_runs_by_conversation(&command.conversation_id);
        let execution_ids: Vec<String> =
            runs.iter().filter_map(|run| run.execution_id.clone()).collect();

        let mut aborted_run_ids = self
            .runtime
            .abort_by_conversation(&command.conversation_id, &reason);

        let aborted_execution_ids = self
            .runtime
            .broadcaster()
            .cancel_executions(&execution_ids, Some(&reason))
            .await;

        let resolver = self.runtime.resolver();
        let mut session_keys = vec![resolver.conversation_key(&command.conversation_id)];
        if let Some(run_id) = command.run_id {
            // Runs admitted without a session key live under the
            // run-scoped fallback key.
            session_keys.push(resolver.run_key(run_id));
        }
        for session_key in session_keys {
            for run_id in self.runtime.abort_by_session_key(&session_key, &reason) {
                if !aborted_run_ids.contains(&run_id) {
                    aborted_run_ids.push(run_id);
                }
            }
        }

        info!(
            conversation_id = %command.conversation_id,
            aborted_runs = aborted_run_ids.len(),
            aborted_executions = aborted_execution_ids.len(),
            "Cancel command processed"
        );

        CancelOutcome {
            aborted_run_ids,
            aborted_execution_ids,
        }
    }
}
