//! OpenAI-compatible chat-completions transport.
//!
//! Implements [`CompletionProvider`](crate::provider::CompletionProvider)
//! against any endpoint speaking the chat-completions wire protocol:
//! request building, SSE chunk decoding, and error mapping.

mod client;
mod stream;
mod types;

pub use client::{ChatCompletionsProvider, ChatProviderConfig, DEFAULT_BASE_URL};
pub use stream::chunk_events;
pub use types::{wire_request, ChatChunk, ChatCompletionsRequest, ChatResponse};
