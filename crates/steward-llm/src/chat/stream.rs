//! Chunk-to-event mapping for the chat-completions stream.

use steward_core::{FinishReason, StreamEvent};
use tracing::warn;

use super::types::ChatChunk;

/// Maps one decoded chunk to zero or more stream events.
///
/// The mapping is stateless: text deltas, tool-call fragments, and the
/// finishing chunk each translate directly, and a chunk can produce several
/// events when a delta and a finish reason arrive together.
#[must_use]
pub fn chunk_events(chunk: &ChatChunk) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    for choice in &chunk.choices {
        if let Some(content) = &choice.delta.content {
            if !content.is_empty() {
                events.push(StreamEvent::TextDelta {
                    delta: content.clone(),
                });
            }
        }
        if let Some(tool_calls) = &choice.delta.tool_calls {
            for call in tool_calls {
                let function = call.function.clone().unwrap_or_default();
                events.push(StreamEvent::ToolCallDelta {
                    index: call.index,
                    id: call.id.clone(),
                    name: function.name,
                    arguments: function.arguments,
                });
            }
        }
        if let Some(reason) = &choice.finish_reason {
            events.push(StreamEvent::Done {
                finish_reason: map_finish_reason(reason),
            });
        }
    }
    events
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" => FinishReason::ToolCalls,
        other => {
            warn!(finish_reason = other, "unknown finish reason, treating as stop");
            FinishReason::Stop
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
