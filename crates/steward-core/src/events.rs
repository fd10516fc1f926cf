//! Event types for the orchestration core.
//!
//! Two event families:
//!
//! - **[`StreamEvent`]**: Low-level model-completion deltas from one provider
//!   stream (text fragments, indexed tool-call fragments, terminal reason).
//! - **[`NarrationEvent`]**: Narration chunks emitted to the transport layer,
//!   one per chunk, with message/stream attribution and a final flag.
//!
//! `StreamEvent` is purely in-memory (never persisted). `NarrationEvent` is
//! what subscribers on the narration channel receive; clients rely on exact
//! type strings and field names.

use serde::{Deserialize, Serialize};

use crate::ids::{ActionId, MessageId};
use crate::run::Run;

// ─────────────────────────────────────────────────────────────────────────────
// StreamEvent — model-completion stream deltas
// ─────────────────────────────────────────────────────────────────────────────

/// Reason a completion stream reported itself done.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Model chose to stop.
    Stop,
    /// Output token limit reached.
    Length,
    /// Model finished emitting tool calls.
    ToolCalls,
}

impl FinishReason {
    /// Stable string form (matches the serialized representation).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
        }
    }
}

/// Events emitted while a model completion streams.
///
/// These are transient and drive the aggregator: text deltas are forwarded
/// as narration immediately, tool-call deltas are merged by `index` in
/// arrival order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Stream started.
    #[serde(rename = "start")]
    Start,

    /// Incremental narration text.
    #[serde(rename = "text_delta")]
    TextDelta {
        /// Text fragment.
        delta: String,
    },

    /// Incremental tool-call fragment.
    ///
    /// The `id` arrives at most once per `index`; `name` and `arguments`
    /// arrive in fragments that must be concatenated in arrival order.
    #[serde(rename = "toolcall_delta")]
    ToolCallDelta {
        /// Position of the tool call within the stream's call list.
        index: u32,
        /// Tool call ID, present on the first fragment only.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Function name fragment.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Partial JSON arguments fragment.
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },

    /// Stream completed with a terminal reason.
    #[serde(rename = "done")]
    Done {
        /// Terminal reason reported by the model.
        #[serde(rename = "finishReason")]
        finish_reason: FinishReason,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream roles
// ─────────────────────────────────────────────────────────────────────────────

/// Role of one completion stream within an aggregated turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamRole {
    /// Narrative text for the user.
    Conversational,
    /// Dedicated tool-identification stream.
    ToolIdentification,
    /// Optional artifact/document stream.
    Artifact,
}

impl StreamRole {
    /// Stable string form (matches the serialized representation).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conversational => "conversational",
            Self::ToolIdentification => "tool_identification",
            Self::Artifact => "artifact",
        }
    }
}

impl std::fmt::Display for StreamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NarrationEvent — transport-facing narration chunks
// ─────────────────────────────────────────────────────────────────────────────

/// Common fields carried by every narration event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationBase {
    /// Narrated message this chunk belongs to.
    pub message_id: MessageId,
    /// Stream the chunk came from, when attributable to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_type: Option<StreamRole>,
    /// Whether this is the last event for its message/stream.
    pub is_final: bool,
}

impl NarrationBase {
    /// A non-final chunk for the given message and stream.
    #[must_use]
    pub fn chunk(message_id: &MessageId, stream_type: Option<StreamRole>) -> Self {
        Self {
            message_id: message_id.clone(),
            stream_type,
            is_final: false,
        }
    }

    /// A terminal event for the given message and stream.
    #[must_use]
    pub fn terminal(message_id: &MessageId, stream_type: Option<StreamRole>) -> Self {
        Self {
            message_id: message_id.clone(),
            stream_type,
            is_final: true,
        }
    }
}

/// Kind of structural segment recognized by the narration segmenter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Plain paragraph.
    Paragraph,
    /// Markdown heading.
    Heading,
    /// Fenced code block.
    CodeBlock,
    /// List item.
    ListItem,
}

/// A completed structural segment of narration text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NarrationSegment {
    /// Segment kind.
    pub kind: SegmentKind,
    /// Segment text with markers stripped.
    pub text: String,
    /// Fence info string for code blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Prompt content of a ready-for-confirmation event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationPrompt {
    /// Synthesized prompt covering every ready action.
    pub prompt: String,
    /// Actions awaiting confirmation, in surfacing order.
    pub action_ids: Vec<ActionId>,
}

/// Narration event emitted to the transport layer, one per chunk.
///
/// Serialized shape is `{type, content, messageId, streamType?, isFinal}`;
/// `content` is variant-specific.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NarrationEvent {
    /// Narration text chunk, forwarded in arrival order for its stream.
    #[serde(rename = "message")]
    Message {
        /// Base fields.
        #[serde(flatten)]
        base: NarrationBase,
        /// Text fragment.
        content: String,
    },

    /// Completed structural segment from the incremental markdown parser.
    #[serde(rename = "segment")]
    Segment {
        /// Base fields.
        #[serde(flatten)]
        base: NarrationBase,
        /// Segment payload.
        content: NarrationSegment,
    },

    /// Terminal marker for one stream; `content` is the full narration text
    /// accumulated on that stream.
    #[serde(rename = "stream_end")]
    StreamEnd {
        /// Base fields.
        #[serde(flatten)]
        base: NarrationBase,
        /// Full accumulated narration for the stream.
        content: String,
    },

    /// One stream failed; its partial narration was already flushed.
    #[serde(rename = "stream_error")]
    StreamError {
        /// Base fields.
        #[serde(flatten)]
        base: NarrationBase,
        /// Human-readable error message.
        content: String,
    },

    /// A generated plan was rejected before execution.
    #[serde(rename = "plan_rejected")]
    PlanRejected {
        /// Base fields.
        #[serde(flatten)]
        base: NarrationBase,
        /// Human-readable rejection reason.
        content: String,
    },

    /// One or more actions became ready and await confirmation.
    #[serde(rename = "ready_for_confirmation")]
    ReadyForConfirmation {
        /// Base fields.
        #[serde(flatten)]
        base: NarrationBase,
        /// Prompt and the batch of ready actions.
        content: ConfirmationPrompt,
    },

    /// Full run snapshot, emitted on every run state change.
    #[serde(rename = "run_update")]
    RunUpdate {
        /// Base fields.
        #[serde(flatten)]
        base: NarrationBase,
        /// The complete run aggregate.
        content: Run,
    },
}

impl NarrationEvent {
    /// Base fields shared by all variants.
    #[must_use]
    pub fn base(&self) -> &NarrationBase {
        match self {
            Self::Message { base, .. }
            | Self::Segment { base, .. }
            | Self::StreamEnd { base, .. }
            | Self::StreamError { base, .. }
            | Self::PlanRejected { base, .. }
            | Self::ReadyForConfirmation { base, .. }
            | Self::RunUpdate { base, .. } => base,
        }
    }

    /// Message ID the event belongs to.
    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        &self.base().message_id
    }

    /// Whether this event terminates its message/stream.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.base().is_final
    }

    /// The serialized `type` string for this event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Segment { .. } => "segment",
            Self::StreamEnd { .. } => "stream_end",
            Self::StreamError { .. } => "stream_error",
            Self::PlanRejected { .. } => "plan_rejected",
            Self::ReadyForConfirmation { .. } => "ready_for_confirmation",
            Self::RunUpdate { .. } => "run_update",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Factory helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Create a narration text chunk event.
#[must_use]
pub fn message_event(
    message_id: &MessageId,
    stream_type: StreamRole,
    content: impl Into<String>,
) -> NarrationEvent {
    NarrationEvent::Message {
        base: NarrationBase::chunk(message_id, Some(stream_type)),
        content: content.into(),
    }
}

/// Create a stream-end event carrying the full accumulated narration.
#[must_use]
pub fn stream_end_event(
    message_id: &MessageId,
    stream_type: StreamRole,
    full_text: impl Into<String>,
) -> NarrationEvent {
    NarrationEvent::StreamEnd {
        base: NarrationBase::terminal(message_id, Some(stream_type)),
        content: full_text.into(),
    }
}

/// Create a per-stream error event.
#[must_use]
pub fn stream_error_event(
    message_id: &MessageId,
    stream_type: StreamRole,
    error: impl Into<String>,
) -> NarrationEvent {
    NarrationEvent::StreamError {
        base: NarrationBase::terminal(message_id, Some(stream_type)),
        content: error.into(),
    }
}

/// Create a run snapshot event.
///
/// Run snapshots form their own event stream keyed by run: the message ID is
/// the run ID, and the event is final once the run reaches a terminal status.
#[must_use]
pub fn run_update_event(run: &Run) -> NarrationEvent {
    let message_id = MessageId::from(run.id.as_str());
    let base = if run.status.is_terminal() {
        NarrationBase::terminal(&message_id, None)
    } else {
        NarrationBase::chunk(&message_id, None)
    };
    NarrationEvent::RunUpdate {
        base,
        content: run.clone(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Type guards
// ─────────────────────────────────────────────────────────────────────────────

/// Narration event type strings.
const NARRATION_EVENT_TYPES: &[&str] = &[
    "message",
    "segment",
    "stream_end",
    "stream_error",
    "plan_rejected",
    "ready_for_confirmation",
    "run_update",
];

/// Check if a type string is a narration event type.
#[must_use]
pub fn is_narration_event_type(type_str: &str) -> bool {
    NARRATION_EVENT_TYPES.contains(&type_str)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
