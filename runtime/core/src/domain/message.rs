// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Conversation message model
//!
//! The minimal message surface the interrupt/resume middleware inspects
//! and rewrites, plus the client-tool wire contracts exchanged with the UI
//! client during one suspend/resume cycle.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            arguments: Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolResultStatus {
    Success,
    Error,
}

/// Canonical tool-result message appended to the conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMessage {
    pub tool_call_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub status: Option<ToolResultStatus>,
    #[serde(default)]
    pub artifact: Option<Value>,
}

/// Assistant (model) message, possibly carrying tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum AgentMessage {
    Human { content: String },
    Assistant(AssistantMessage),
    Tool(ToolMessage),
}

impl AgentMessage {
    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            AgentMessage::Assistant(message) => Some(message),
            _ => None,
        }
    }
}

/// Mutable graph state inspected after each model turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    #[serde(default)]
    pub messages: Vec<AgentMessage>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl AgentState {
    /// Most recent assistant message, if any.
    pub fn last_assistant(&self) -> Option<&AssistantMessage> {
        self.messages.iter().rev().find_map(|m| m.as_assistant())
    }
}

/// Request handed to the UI client when selected tool calls must execute
/// outside the server process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientToolRequest {
    pub client_tool_calls: Vec<ToolCall>,
}

/// Loose tool-result payload supplied by the client on resume. Resolved
/// into a canonical [`ToolMessage`] against the original call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientToolMessagePayload {
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub status: Option<ToolResultStatus>,
    #[serde(default)]
    pub artifact: Option<Value>,
}

/// Response re-entering the graph on resume. `tool_messages` must match
/// the suspended request's `client_tool_calls` in length and order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientToolResponse {
    pub tool_messages: Vec<ClientToolMessagePayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_tool_request_wire_shape() {
        let request = ClientToolRequest {
            client_tool_calls: vec![ToolCall::new("t1", "openFile")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("clientToolCalls").is_some());
    }

    #[test]
    fn response_payload_accepts_loose_entries() {
        let response: ClientToolResponse =
            serde_json::from_str(r#"{"toolMessages":[{"content":"ok"}]}"#).unwrap();
        assert_eq!(response.tool_messages.len(), 1);
        assert!(response.tool_messages[0].tool_call_id.is_none());
        assert_eq!(response.tool_messages[0].content, Value::from("ok"));
    }

    #[test]
    fn last_assistant_skips_tool_messages() {
        let state = AgentState {
            messages: vec![
                AgentMessage::Assistant(AssistantMessage {
                    content: "first".into(),
                    tool_calls: vec![],
                }),
                AgentMessage::Tool(ToolMessage {
                    tool_call_id: "t1".into(),
                    name: None,
                    content: "ok".into(),
                    status: None,
                    artifact: None,
                }),
            ],
            summary: None,
        };
        assert_eq!(state.last_assistant().unwrap().content, "first");
    }
}
