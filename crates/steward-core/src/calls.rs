//! Tool call and tool result wire types.
//!
//! A [`ToolCall`] is produced by the aggregator or planner and consumed by the
//! orchestrator; a [`ToolResult`] is what the orchestrator hands back. Both
//! serialize to the exact shapes the transport layer forwards to clients.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{SessionId, ToolCallId, UserId};

/// A fully-reconstructed tool invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID.
    pub id: ToolCallId,
    /// Tool name, resolved against the registry before execution.
    pub name: String,
    /// Parsed JSON argument object.
    pub arguments: Map<String, Value>,
    /// Session the call belongs to.
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    /// User on whose behalf the call executes.
    #[serde(rename = "userId")]
    pub user_id: UserId,
}

impl ToolCall {
    /// Create a tool call with a fresh ID.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        arguments: Map<String, Value>,
        session_id: SessionId,
        user_id: UserId,
    ) -> Self {
        Self {
            id: ToolCallId::new(),
            name: name.into(),
            arguments,
            session_id,
            user_id,
        }
    }
}

/// Terminal status of one tool execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Connector produced a usable payload.
    Success,
    /// Connector reported failure or dispatch errored.
    Failed,
}

/// Outcome of one tool execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Terminal status.
    pub status: ToolStatus,
    /// Tool that produced the result.
    #[serde(rename = "toolName")]
    pub tool_name: String,
    /// Raw payload on success; `null` otherwise.
    pub data: Option<Value>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Successful result carrying the connector's raw payload.
    #[must_use]
    pub fn success(tool_name: impl Into<String>, data: Value) -> Self {
        Self {
            status: ToolStatus::Success,
            tool_name: tool_name.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Failed result with a human-readable message.
    #[must_use]
    pub fn failed(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Failed,
            tool_name: tool_name.into(),
            data: None,
            error: Some(error.into()),
        }
    }

    /// Whether the execution succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
