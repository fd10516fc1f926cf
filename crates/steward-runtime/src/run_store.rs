//! Run store — concurrent ledger of runs with snapshot emission.
//!
//! The store owns the mutability that the pure lifecycle functions in
//! `steward_core::run` deliberately avoid: each mutation takes the run out of
//! the map entry, threads it through the pure transition, and writes the
//! successor back under the entry lock. Every observable change emits one
//! `run_update` snapshot carrying the full run, so transports reconstruct
//! state from the latest event alone.

use std::sync::Arc;

use dashmap::DashMap;
use steward_core::{
    finalize_run, record_tool_result, run_update_event, start_tool_execution, PlanId, Run, RunId,
    SessionId, ToolCallId, ToolResult,
};
use tracing::{debug, instrument};

use crate::emitter::NarrationEmitter;

/// Concurrent store of runs, indexed by run ID and by plan ID.
pub struct RunStore {
    runs: DashMap<RunId, Run>,
    by_plan: DashMap<PlanId, RunId>,
    emitter: Arc<NarrationEmitter>,
}

impl RunStore {
    /// Store emitting snapshots through the given channel.
    #[must_use]
    pub fn new(emitter: Arc<NarrationEmitter>) -> Self {
        Self {
            runs: DashMap::new(),
            by_plan: DashMap::new(),
            emitter,
        }
    }

    /// Track a freshly created run and emit its initial snapshot.
    #[instrument(skip_all, fields(run_id = %run.id, plan_id = %run.plan_id))]
    pub fn insert(&self, run: Run) -> Run {
        let _ = self.by_plan.insert(run.plan_id.clone(), run.id.clone());
        let _ = self.runs.insert(run.id.clone(), run.clone());
        let _ = self.emitter.emit(run_update_event(&run));
        debug!(steps = run.steps.len(), "run tracked");
        run
    }

    /// Snapshot of a run by ID.
    #[must_use]
    pub fn get(&self, run_id: &RunId) -> Option<Run> {
        self.runs.get(run_id).map(|entry| entry.clone())
    }

    /// Snapshot of the run executing the given plan.
    #[must_use]
    pub fn get_by_plan(&self, plan_id: &PlanId) -> Option<Run> {
        let run_id = self.by_plan.get(plan_id)?.clone();
        self.get(&run_id)
    }

    /// Mark a step's dispatch as started.
    pub fn start_step(&self, run_id: &RunId, tool_call_id: &ToolCallId) -> Option<Run> {
        self.apply(run_id, |run| start_tool_execution(run, tool_call_id))
    }

    /// Record a step's terminal result.
    pub fn record_result(
        &self,
        run_id: &RunId,
        tool_call_id: &ToolCallId,
        result: ToolResult,
    ) -> Option<Run> {
        self.apply(run_id, |run| record_tool_result(run, tool_call_id, result))
    }

    /// Finalize the run if every step has a recorded result.
    pub fn finalize(&self, run_id: &RunId) -> Option<Run> {
        self.apply(run_id, finalize_run)
    }

    /// Drop every run belonging to the session.
    pub fn clear_session(&self, session_id: &SessionId) {
        let doomed: Vec<RunId> = self
            .runs
            .iter()
            .filter(|entry| entry.session_id == *session_id)
            .map(|entry| entry.id.clone())
            .collect();
        for run_id in doomed {
            if let Some((_, run)) = self.runs.remove(&run_id) {
                let _ = self.by_plan.remove(&run.plan_id);
            }
        }
    }

    /// Number of tracked runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Thread one pure transition through the stored run under its entry
    /// lock. A snapshot is emitted only when the transition changed the run;
    /// no-op transitions (duplicate starts, premature finalize) stay silent.
    fn apply(&self, run_id: &RunId, transition: impl FnOnce(Run) -> Run) -> Option<Run> {
        let mut entry = self.runs.get_mut(run_id)?;
        let before = entry.clone();
        let after = transition(before.clone());
        if after != before {
            *entry = after.clone();
            drop(entry);
            let _ = self.emitter.emit(run_update_event(&after));
            debug!(run_id = %run_id, status = ?after.status, "run updated");
        }
        Some(after)
    }
}

impl std::fmt::Debug for RunStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStore").field("runs", &self.runs.len()).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
