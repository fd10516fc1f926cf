//! # steward-runtime
//!
//! The orchestration pipeline for one assistant turn:
//!
//! - [`StreamAggregator`]: concurrent role streams joined at a fan-in barrier,
//!   with incremental markdown segmentation and tool-call fragment assembly
//! - [`Planner`]: one structured-output completion, whole-plan validation
//! - [`ActionLauncher`]: per-session launchable actions with parameter
//!   collection and an execution gate
//! - [`ToolOrchestrator`]: the dispatch pipeline (resolve, sanitize, connect,
//!   execute, interpret) that never lets a step failure escape as an error
//! - [`RunStore`]: the run ledger, emitting a full snapshot per state change
//! - [`TurnRunner`]: the facade wiring all of the above for a session
//!
//! Narration, readiness prompts, and run snapshots all flow through a single
//! broadcast [`NarrationEmitter`]; transports subscribe and forward.

#![deny(unsafe_code)]

pub mod aggregator;
pub mod emitter;
pub mod errors;
pub mod launcher;
pub mod orchestrator;
pub mod planner;
pub mod resolve;
pub mod run_store;
pub mod segment;
pub mod turn;

pub use aggregator::{AggregatedTurn, StreamAggregator, StreamInput, StreamOutcome};
pub use emitter::{NarrationEmitter, DEFAULT_CHANNEL_CAPACITY};
pub use errors::{LaunchError, PlanError, ResolveError, RuntimeError};
pub use launcher::{
    ActionLauncher, ActionParameter, ActionStatus, LaunchableAction, ParameterUpdate,
};
pub use orchestrator::ToolOrchestrator;
pub use planner::{ActionStep, ActionStepStatus, Planner};
pub use resolve::{resolve_against_run, RunLedgerResolver, StepResolver};
pub use run_store::RunStore;
pub use segment::MarkdownSegmenter;
pub use turn::{TurnOptions, TurnOutcome, TurnRunner};
