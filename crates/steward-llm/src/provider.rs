//! Completion provider abstraction.
//!
//! The runtime talks to models exclusively through [`CompletionProvider`]:
//! one method for token streaming and one for single-shot structured output.
//! Concrete transports live in [`crate::chat`]; tests substitute scripted
//! implementations.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use steward_core::StreamEvent;

use crate::error::ProviderResult;

/// Boxed stream of decoded provider events.
pub type StreamEventStream = Pin<Box<dyn Stream<Item = ProviderResult<StreamEvent>> + Send>>;

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions injected by the runtime.
    System,
    /// End-user input.
    User,
    /// Prior model output replayed as history.
    Assistant,
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// System-role message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User-role message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Assistant-role message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A callable function advertised to the model.
///
/// `parameters` is a JSON Schema object describing the argument shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFunction {
    /// Function name the model will reference in tool-call deltas.
    pub name: String,
    /// What the function does, shown to the model.
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

/// Constraint on the shape of a non-streaming completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// The model must emit a single valid JSON object.
    JsonObject,
}

/// Everything needed to issue one completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Model identifier understood by the endpoint.
    pub model: String,
    /// System prompt, prepended to `messages` when present.
    pub system_prompt: Option<String>,
    /// Conversation history, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Functions the model may call. Empty means text-only.
    pub tools: Vec<ToolFunction>,
    /// Sampling temperature override.
    pub temperature: Option<f64>,
    /// Completion length cap in tokens.
    pub max_tokens: Option<u32>,
    /// Output-shape constraint for structured calls.
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    /// Request with the given model and no history.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Appends a message to the history.
    #[must_use]
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Advertises callable functions.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolFunction>) -> Self {
        self.tools = tools;
        self
    }

    /// Constrains the output shape.
    #[must_use]
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// A model endpoint the runtime can stream from.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Opens a streaming completion.
    ///
    /// The returned stream yields a `Start` event, then deltas, then `Done`.
    /// Mid-stream failures surface as an `Err` item; the stream ends after it.
    async fn stream(&self, request: &CompletionRequest) -> ProviderResult<StreamEventStream>;

    /// Issues a non-streaming completion constrained to a single JSON object.
    ///
    /// Returns the decoded object. A 2xx response whose content is missing or
    /// not valid JSON maps to [`ProviderError::MalformedResponse`].
    ///
    /// [`ProviderError::MalformedResponse`]: crate::error::ProviderError::MalformedResponse
    async fn complete_json(&self, request: &CompletionRequest) -> ProviderResult<Value>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
