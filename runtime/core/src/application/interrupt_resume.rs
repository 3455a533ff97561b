// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Interrupt/resume middleware - client-side tool execution
//!
//! Routes selected tool calls to an external actor (the UI client) and
//! suspends the run durably until results arrive. The only suspension
//! point is the after-model hook: it partitions the last assistant
//! message's tool calls into client tools and remaining tools, persists a
//! pending interrupt through the durable suspension store, and hands back
//! a token. Resume validates the client's response, rewrites the
//! assistant message to carry only the remaining tool calls, and appends
//! the resolved tool results - in a different process than the one that
//! suspended, if need be.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::domain::checkpoint::{
    CheckpointConfig, DurableSuspension, SuspendToken, SuspendedInterrupt, SuspensionPhase,
};
use crate::domain::error::RuntimeError;
use crate::domain::message::{
    AgentMessage, AgentState, ClientToolMessagePayload, ClientToolRequest, ClientToolResponse,
    ToolCall, ToolMessage,
};

/// Where control jumps after a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JumpTarget {
    Model,
}

#[derive(Debug)]
pub enum AfterModelOutcome {
    /// No client tool calls; control returns to the caller unchanged.
    Pass,
    /// The run is durably suspended awaiting client tool results.
    Suspended(SuspendToken),
}

/// State delta a successful resume applies to the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeUpdate {
    /// The rewritten assistant message followed by the resolved tool
    /// results, in request order.
    pub messages: Vec<AgentMessage>,
    /// `Some(Model)` exactly when no tool calls remain for ordinary
    /// execution.
    pub jump_to: Option<JumpTarget>,
}

pub struct InterruptResumeMiddleware {
    client_tools: HashSet<String>,
    suspension: Arc<dyn DurableSuspension>,
}

impl InterruptResumeMiddleware {
    pub fn new(
        client_tools: impl IntoIterator<Item = String>,
        suspension: Arc<dyn DurableSuspension>,
    ) -> Self {
        Self {
            client_tools: client_tools.into_iter().collect(),
            suspension,
        }
    }

    pub fn client_tool_names(&self) -> Vec<&str> {
        self.client_tools.iter().map(String::as_str).collect()
    }

    /// Inspects the most recent assistant message after a model turn.
    pub async fn after_model(
        &self,
        state: &AgentState,
        config: &CheckpointConfig,
    ) -> Result<AfterModelOutcome, RuntimeError> {
        if self.client_tools.is_empty() || state.messages.is_empty() {
            return Ok(AfterModelOutcome::Pass);
        }
        let Some(assistant) = state.last_assistant() else {
            return Ok(AfterModelOutcome::Pass);
        };
        if assistant.tool_calls.is_empty() {
            return Ok(AfterModelOutcome::Pass);
        }

        let (client_tool_calls, remaining_tool_calls): (Vec<ToolCall>, Vec<ToolCall>) = assistant
            .tool_calls
            .iter()
            .cloned()
            .partition(|call| self.client_tools.contains(&call.name));
        if client_tool_calls.is_empty() {
            return Ok(AfterModelOutcome::Pass);
        }

        let interrupt = SuspendedInterrupt {
            id: Uuid::new_v4(),
            phase: SuspensionPhase::Suspended,
            assistant: assistant.clone(),
            request: ClientToolRequest { client_tool_calls },
            remaining_tool_calls,
            suspended_at: Utc::now(),
        };
        let token = self.suspension.suspend(config, interrupt).await?;

        info!(
            thread_id = %config.thread_id,
            "Suspended run awaiting client tool results"
        );
        Ok(AfterModelOutcome::Suspended(token))
    }

    /// Completes a suspend/resume cycle with the client's response.
    ///
    /// A validation failure leaves the interrupt in place so the caller
    /// can retry with a corrected response; it never corrupts the run.
    pub async fn resume(
        &self,
        token: &SuspendToken,
        response: ClientToolResponse,
    ) -> Result<ResumeUpdate, RuntimeError> {
        let interrupt = self.suspension.load(token).await?;
        self.suspension
            .mark(token, SuspensionPhase::Resuming)
            .await?;

        let client_tool_calls = &interrupt.request.client_tool_calls;
        let tool_messages = response.tool_messages;
        if tool_messages.len() != client_tool_calls.len() {
            return Err(RuntimeError::validation(format!(
                "Number of toolMessages ({}) does not match number of client tool calls ({}).",
                tool_messages.len(),
                client_tool_calls.len()
            )));
        }

        let mut resolved = Vec::with_capacity(tool_messages.len());
        for (payload, call) in tool_messages.into_iter().zip(client_tool_calls) {
            resolved.push(resolve_tool_message(payload, call)?);
        }

        let mut assistant = interrupt.assistant.clone();
        assistant.tool_calls = interrupt.remaining_tool_calls.clone();
        let jump_to = if assistant.tool_calls.is_empty() {
            Some(JumpTarget::Model)
        } else {
            None
        };

        let mut messages = vec![AgentMessage::Assistant(assistant)];
        messages.extend(resolved.into_iter().map(AgentMessage::Tool));

        self.suspension.complete(token).await?;

        info!(
            thread_id = %token.config.thread_id,
            resumed_tools = messages.len() - 1,
            "Resumed run with client tool results"
        );
        Ok(ResumeUpdate { messages, jump_to })
    }
}

/// Resolves a loose client payload into a canonical tool message: the
/// payload's `tool_call_id` wins, falling back to the original call's id;
/// non-string content is serialized to JSON text.
fn resolve_tool_message(
    payload: ClientToolMessagePayload,
    call: &ToolCall,
) -> Result<ToolMessage, RuntimeError> {
    let tool_call_id = payload
        .tool_call_id
        .or_else(|| call.id.clone())
        .ok_or_else(|| {
            RuntimeError::validation(format!(
                "Missing tool_call_id for client tool \"{}\". Provide tool_call_id in the \
                 response or ensure the tool call has an id.",
                call.name
            ))
        })?;

    let content = match payload.content {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => serde_json::to_string(&other)
            .map_err(|err| RuntimeError::Internal(err.to_string()))?,
    };

    Ok(ToolMessage {
        tool_call_id,
        name: payload.name.or_else(|| Some(call.name.clone())),
        content,
        status: payload.status,
        artifact: payload.artifact,
    })
}
