//! Chat-completions wire types.
//!
//! Request structs serialize exactly what the endpoint expects; response
//! structs decode leniently with defaults so absent fields never fail a
//! whole chunk.

use serde::{Deserialize, Serialize};

use crate::provider::{ChatMessage, ChatRole, CompletionRequest, ResponseFormat, ToolFunction};

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// Outgoing chat-completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionsRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation, oldest first, system prompt at the front.
    pub messages: Vec<WireMessage>,
    /// Whether the response is an SSE stream.
    pub stream: bool,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Completion length cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Advertised functions, omitted entirely when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    /// Output-shape constraint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<WireResponseFormat>,
}

/// One message in the outgoing request.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    /// `system`, `user`, or `assistant`.
    pub role: &'static str,
    /// Message text.
    pub content: String,
}

/// Function wrapper in the `tools` array.
#[derive(Debug, Clone, Serialize)]
pub struct WireTool {
    /// Always `function`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// The function definition.
    pub function: ToolFunction,
}

/// `response_format` object.
#[derive(Debug, Clone, Serialize)]
pub struct WireResponseFormat {
    /// Constraint kind, currently always `json_object`.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

const fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn wire_message(message: &ChatMessage) -> WireMessage {
    WireMessage {
        role: role_name(message.role),
        content: message.content.clone(),
    }
}

/// Builds the request body for one completion call.
#[must_use]
pub fn wire_request(request: &CompletionRequest, stream: bool) -> ChatCompletionsRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(prompt) = &request.system_prompt {
        messages.push(WireMessage {
            role: "system",
            content: prompt.clone(),
        });
    }
    messages.extend(request.messages.iter().map(wire_message));

    ChatCompletionsRequest {
        model: request.model.clone(),
        messages,
        stream,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        tools: request
            .tools
            .iter()
            .map(|function| WireTool {
                kind: "function",
                function: function.clone(),
            })
            .collect(),
        response_format: request.response_format.map(|format| match format {
            ResponseFormat::JsonObject => WireResponseFormat {
                kind: "json_object",
            },
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming response
// ─────────────────────────────────────────────────────────────────────────────

/// One decoded SSE chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    /// Choices carried by this chunk, usually exactly one.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// One choice inside a streaming chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    /// Incremental content.
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Set on the final chunk of the choice.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental message content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    /// Appended text, when this chunk carries prose.
    #[serde(default)]
    pub content: Option<String>,
    /// Tool-call fragments, when this chunk carries a call.
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallChunk>>,
}

/// One tool-call fragment inside a delta.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallChunk {
    /// Slot index the fragment belongs to.
    #[serde(default)]
    pub index: u32,
    /// Call id, present on the first fragment of a slot.
    #[serde(default)]
    pub id: Option<String>,
    /// Name and argument pieces.
    #[serde(default)]
    pub function: Option<FunctionChunk>,
}

/// Name/argument pieces of a tool-call fragment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionChunk {
    /// Function name piece.
    #[serde(default)]
    pub name: Option<String>,
    /// Argument JSON piece.
    #[serde(default)]
    pub arguments: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Non-streaming response
// ─────────────────────────────────────────────────────────────────────────────

/// Body of a non-streaming completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Completed choices.
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
}

/// One completed choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseChoice {
    /// The full assistant message.
    #[serde(default)]
    pub message: ResponseMessage,
}

/// Assistant message in a completed choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    /// Message text.
    #[serde(default)]
    pub content: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_minimal_shape() {
        let request = CompletionRequest::new("m1").with_message(ChatMessage::user("hi"));
        let body = serde_json::to_value(wire_request(&request, true)).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "m1",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn system_prompt_leads_the_messages() {
        let request = CompletionRequest::new("m1")
            .with_system_prompt("rules")
            .with_message(ChatMessage::user("hi"));
        let body = wire_request(&request, false);

        assert_eq!(body.messages[0].role, "system");
        assert_eq!(body.messages[0].content, "rules");
        assert_eq!(body.messages[1].role, "user");
    }

    #[test]
    fn tools_and_response_format_serialize() {
        let request = CompletionRequest::new("m1")
            .with_tools(vec![ToolFunction {
                name: "send_email".to_string(),
                description: "Send an email".to_string(),
                parameters: json!({"type": "object"}),
            }])
            .with_response_format(ResponseFormat::JsonObject);
        let body = serde_json::to_value(wire_request(&request, false)).unwrap();

        assert_eq!(body["tools"][0]["type"], json!("function"));
        assert_eq!(body["tools"][0]["function"]["name"], json!("send_email"));
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
    }

    #[test]
    fn chunk_decodes_with_missing_fields() {
        let chunk: ChatChunk = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{"delta": {}}]
        }))
        .unwrap();
        assert_eq!(chunk.choices.len(), 1);
        assert!(chunk.choices[0].delta.content.is_none());
        assert!(chunk.choices[0].finish_reason.is_none());

        let chunk: ChatChunk = serde_json::from_value(json!({})).unwrap();
        assert!(chunk.choices.is_empty());
    }

    #[test]
    fn tool_call_chunk_decodes() {
        let chunk: ChatChunk = serde_json::from_value(json!({
            "choices": [{
                "delta": {
                    "tool_calls": [{
                        "index": 0,
                        "id": "call_9",
                        "function": {"name": "send_email", "arguments": "{\"to\":"}
                    }]
                }
            }]
        }))
        .unwrap();

        let calls = chunk.choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].index, 0);
        assert_eq!(calls[0].id.as_deref(), Some("call_9"));
        let function = calls[0].function.as_ref().unwrap();
        assert_eq!(function.name.as_deref(), Some("send_email"));
        assert_eq!(function.arguments.as_deref(), Some("{\"to\":"));
    }
}
