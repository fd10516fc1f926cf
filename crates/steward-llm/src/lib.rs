//! # steward-llm
//!
//! Model-provider abstraction for the steward runtime:
//!
//! - [`CompletionProvider`] trait with streaming and structured-output calls
//! - Chat-completions HTTP client implementing the trait over SSE
//! - Incremental SSE line parsing over a byte stream
//! - Tool-call fragment accumulation across streamed deltas

#![deny(unsafe_code)]

pub mod chat;
pub mod error;
pub mod fragments;
pub mod provider;
pub mod sse;

pub use chat::{ChatCompletionsProvider, ChatProviderConfig};
pub use error::{ProviderError, ProviderResult};
pub use fragments::{parse_tool_call_arguments, FragmentAccumulator};
pub use provider::{
    ChatMessage, ChatRole, CompletionProvider, CompletionRequest, ResponseFormat, StreamEventStream,
    ToolFunction,
};
pub use sse::{decode_sse_data, extract_sse_data, parse_sse_lines};
