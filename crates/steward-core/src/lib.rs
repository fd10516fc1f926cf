//! # steward-core
//!
//! Foundation types for the Steward run orchestration core.
//!
//! This crate provides the shared vocabulary that all other Steward crates
//! depend on:
//!
//! - **Branded IDs**: `SessionId`, `RunId`, `ActionId`, ... as newtypes for type safety
//! - **Stream events**: `StreamEvent` deltas produced by model-completion streams
//! - **Narration events**: `NarrationEvent` wire enum emitted to the transport layer
//! - **Tool calls**: `ToolCall` / `ToolResult` as exchanged between planner, launcher
//!   and orchestrator
//! - **Runs**: the `Run` aggregate plus the pure lifecycle functions that fold
//!   per-step outcomes into a single terminal status

#![deny(unsafe_code)]

pub mod calls;
pub mod events;
pub mod ids;
pub mod run;

pub use calls::{ToolCall, ToolResult, ToolStatus};
pub use events::{
    is_narration_event_type, message_event, run_update_event, stream_end_event,
    stream_error_event, ConfirmationPrompt, FinishReason, NarrationBase, NarrationEvent,
    NarrationSegment, SegmentKind, StreamEvent, StreamRole,
};
pub use ids::{ActionId, MessageId, PlanId, RunId, SessionId, StepId, ToolCallId, UserId};
pub use run::{
    create_run, finalize_run, record_tool_result, start_tool_execution, Run, RunStatus,
    StepStatus, ToolExecutionStep,
};
