//! The run aggregate and its pure lifecycle functions.
//!
//! A [`Run`] is one end-to-end execution of a multi-step action plan. All
//! state transitions are pure functions: each takes a `Run` and returns the
//! next `Run`, which makes the finalization properties (order independence,
//! idempotence) mechanically checkable. Stores own the mutability; this
//! module owns the rules.
//!
//! Lifecycle: `pending -> running -> {completed | partial_success | failed}`.
//! The run status never moves backward, and finalization is all-or-nothing:
//! [`finalize_run`] is a no-op until every step holds a recorded result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calls::{ToolCall, ToolResult, ToolStatus};
use crate::ids::{PlanId, RunId, SessionId, ToolCallId, UserId};

/// Maximum characters of user input kept on the run as context.
const CONTEXT_SNAPSHOT_MAX_CHARS: usize = 500;

/// Aggregate status of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, no step started yet.
    Pending,
    /// At least one step started.
    Running,
    /// Every step succeeded.
    Completed,
    /// At least one step succeeded and at least one did not.
    PartialSuccess,
    /// No step succeeded (or the plan had no steps).
    Failed,
}

impl RunStatus {
    /// Whether the status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::PartialSuccess | Self::Failed)
    }
}

/// Execution status of one step inside a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not started.
    Pending,
    /// Dispatch in flight.
    Running,
    /// Result recorded as success.
    Success,
    /// Result recorded as failure.
    Failed,
}

/// One step of a run: a tool call plus its execution record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionStep {
    /// The tool call this step executes.
    pub tool_call: ToolCall,
    /// Current step status.
    pub status: StepStatus,
    /// Recorded outcome, present once the step is terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolResult>,
    /// When dispatch started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the result was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ToolExecutionStep {
    fn pending(tool_call: ToolCall) -> Self {
        Self {
            tool_call,
            status: StepStatus::Pending,
            result: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// One end-to-end execution of an action plan.
///
/// Serialized in full to the transport layer on every state change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Run ID.
    pub id: RunId,
    /// Plan this run executes.
    pub plan_id: PlanId,
    /// Session the run belongs to.
    pub session_id: SessionId,
    /// User on whose behalf the run executes.
    pub user_id: UserId,
    /// Aggregate status.
    pub status: RunStatus,
    /// When the first step started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the run was finalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Ordered execution steps.
    pub steps: Vec<ToolExecutionStep>,
    /// Run this one follows up on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<RunId>,
    /// Truncated user input that produced the plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_snapshot: Option<String>,
}

impl Run {
    /// Attach the plan ID the planner assigned.
    #[must_use]
    pub fn with_plan_id(mut self, plan_id: PlanId) -> Self {
        self.plan_id = plan_id;
        self
    }

    /// Mark this run as a follow-up of `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: RunId) -> Self {
        self.parent_run_id = Some(parent);
        self
    }

    /// Step matching the given tool call ID, if any.
    #[must_use]
    pub fn step(&self, tool_call_id: &ToolCallId) -> Option<&ToolExecutionStep> {
        self.steps.iter().find(|s| s.tool_call.id == *tool_call_id)
    }

    /// Whether every step holds a recorded result.
    #[must_use]
    pub fn all_steps_recorded(&self) -> bool {
        self.steps.iter().all(|s| s.result.is_some())
    }
}

/// Create a new run in `pending` with all steps unstarted.
#[must_use]
pub fn create_run(
    session_id: &SessionId,
    user_id: &UserId,
    user_input: &str,
    tool_calls: Vec<ToolCall>,
) -> Run {
    let context_snapshot = if user_input.is_empty() {
        None
    } else {
        Some(user_input.chars().take(CONTEXT_SNAPSHOT_MAX_CHARS).collect())
    };
    Run {
        id: RunId::new(),
        plan_id: PlanId::new(),
        session_id: session_id.clone(),
        user_id: user_id.clone(),
        status: RunStatus::Pending,
        started_at: None,
        completed_at: None,
        steps: tool_calls.into_iter().map(ToolExecutionStep::pending).collect(),
        parent_run_id: None,
        context_snapshot,
    }
}

/// Mark the matching step `running` and set the run `running` on first start.
///
/// No-op on terminal runs, unknown tool call IDs, and steps already past
/// `pending` (status never moves backward).
#[must_use]
pub fn start_tool_execution(mut run: Run, tool_call_id: &ToolCallId) -> Run {
    if run.status.is_terminal() {
        return run;
    }
    let Some(step) = run
        .steps
        .iter_mut()
        .find(|s| s.tool_call.id == *tool_call_id)
    else {
        return run;
    };
    if step.status != StepStatus::Pending {
        return run;
    }
    step.status = StepStatus::Running;
    step.started_at = Some(Utc::now());
    if run.status == RunStatus::Pending {
        run.status = RunStatus::Running;
        run.started_at = Some(Utc::now());
    }
    run
}

/// Record a step's terminal result. Does **not** finalize the run.
///
/// First write wins: a step with a recorded result is left untouched, so a
/// duplicate dispatch report cannot flip an outcome.
#[must_use]
pub fn record_tool_result(mut run: Run, tool_call_id: &ToolCallId, result: ToolResult) -> Run {
    let Some(step) = run
        .steps
        .iter_mut()
        .find(|s| s.tool_call.id == *tool_call_id)
    else {
        return run;
    };
    if step.result.is_some() {
        return run;
    }
    step.status = match result.status {
        ToolStatus::Success => StepStatus::Success,
        ToolStatus::Failed => StepStatus::Failed,
    };
    step.result = Some(result);
    step.finished_at = Some(Utc::now());
    run
}

/// Finalize the run once every step has a recorded result.
///
/// No-op while any result is missing and on already-terminal runs. The
/// derived status is a pure function of the outcome multiset:
///
/// - zero steps total -> `failed`
/// - all steps success -> `completed`
/// - at least one success and at least one non-success -> `partial_success`
/// - zero success -> `failed`
#[must_use]
pub fn finalize_run(mut run: Run) -> Run {
    if run.status.is_terminal() {
        return run;
    }
    if !run.steps.is_empty() && !run.all_steps_recorded() {
        return run;
    }

    let successes = run
        .steps
        .iter()
        .filter(|s| s.result.as_ref().is_some_and(ToolResult::is_success))
        .count();

    run.status = if run.steps.is_empty() || successes == 0 {
        RunStatus::Failed
    } else if successes == run.steps.len() {
        RunStatus::Completed
    } else {
        RunStatus::PartialSuccess
    };
    run.completed_at = Some(Utc::now());
    run
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn call(name: &str) -> ToolCall {
        ToolCall::new(
            name,
            serde_json::Map::new(),
            SessionId::from("sess-1"),
            UserId::from("user-1"),
        )
    }

    fn run_with_calls(n: usize) -> Run {
        let calls = (0..n).map(|i| call(&format!("tool_{i}"))).collect();
        create_run(
            &SessionId::from("sess-1"),
            &UserId::from("user-1"),
            "send the quarterly update",
            calls,
        )
    }

    fn result_for(run: &Run, index: usize, success: bool) -> (ToolCallId, ToolResult) {
        let step = &run.steps[index];
        let name = step.tool_call.name.clone();
        let result = if success {
            ToolResult::success(&name, json!({"ok": true}))
        } else {
            ToolResult::failed(&name, "dispatch failed")
        };
        (step.tool_call.id.clone(), result)
    }

    /// Record the given outcomes in the given order, then finalize.
    fn record_and_finalize(mut run: Run, outcomes: &[bool], order: &[usize]) -> Run {
        for &i in order {
            let (id, result) = result_for(&run, i, outcomes[i]);
            run = record_tool_result(run, &id, result);
        }
        finalize_run(run)
    }

    // ── create_run ───────────────────────────────────────────────────

    #[test]
    fn create_run_is_pending_with_unstarted_steps() {
        let run = run_with_calls(2);
        assert_eq!(run.status, RunStatus::Pending);
        assert!(run.started_at.is_none());
        assert!(run.completed_at.is_none());
        assert_eq!(run.steps.len(), 2);
        for step in &run.steps {
            assert_eq!(step.status, StepStatus::Pending);
            assert!(step.result.is_none());
        }
    }

    #[test]
    fn create_run_truncates_context_snapshot() {
        let long_input = "x".repeat(2000);
        let run = create_run(
            &SessionId::from("s"),
            &UserId::from("u"),
            &long_input,
            vec![call("send_email")],
        );
        assert_eq!(run.context_snapshot.as_ref().unwrap().len(), 500);
    }

    #[test]
    fn create_run_empty_input_has_no_snapshot() {
        let run = create_run(&SessionId::from("s"), &UserId::from("u"), "", vec![]);
        assert!(run.context_snapshot.is_none());
    }

    // ── start_tool_execution ─────────────────────────────────────────

    #[test]
    fn start_marks_step_and_run_running() {
        let run = run_with_calls(2);
        let id = run.steps[0].tool_call.id.clone();
        let run = start_tool_execution(run, &id);
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.started_at.is_some());
        assert_eq!(run.steps[0].status, StepStatus::Running);
        assert!(run.steps[0].started_at.is_some());
        assert_eq!(run.steps[1].status, StepStatus::Pending);
    }

    #[test]
    fn second_start_does_not_reset_timestamps() {
        let run = run_with_calls(1);
        let id = run.steps[0].tool_call.id.clone();
        let run = start_tool_execution(run, &id);
        let started = run.steps[0].started_at;
        let run = start_tool_execution(run, &id);
        assert_eq!(run.steps[0].started_at, started);
    }

    #[test]
    fn start_with_unknown_id_is_noop() {
        let run = run_with_calls(1);
        let before = run.clone();
        let run = start_tool_execution(run, &ToolCallId::from("missing"));
        assert_eq!(run, before);
    }

    // ── record_tool_result ───────────────────────────────────────────

    #[test]
    fn record_sets_result_but_does_not_finalize() {
        let run = run_with_calls(2);
        let (id, result) = result_for(&run, 0, true);
        let run = record_tool_result(run, &id, result);
        assert_eq!(run.steps[0].status, StepStatus::Success);
        assert!(run.steps[0].result.is_some());
        assert!(run.steps[0].finished_at.is_some());
        // Run status untouched until finalize
        assert_eq!(run.status, RunStatus::Pending);
    }

    #[test]
    fn record_first_write_wins() {
        let run = run_with_calls(1);
        let (id, ok) = result_for(&run, 0, true);
        let run = record_tool_result(run, &id, ok);
        let (_, bad) = result_for(&run, 0, false);
        let run = record_tool_result(run, &id, bad);
        assert_eq!(run.steps[0].status, StepStatus::Success);
    }

    // ── finalize_run ─────────────────────────────────────────────────

    #[test]
    fn finalize_is_noop_until_every_step_has_a_result() {
        let run = run_with_calls(2);
        let (id, result) = result_for(&run, 0, true);
        let run = record_tool_result(run, &id, result);
        let run = finalize_run(run);
        assert_eq!(run.status, RunStatus::Pending);
        assert!(run.completed_at.is_none());
    }

    #[test]
    fn finalize_zero_steps_is_failed() {
        let run = run_with_calls(0);
        let run = finalize_run(run);
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.completed_at.is_some());
    }

    #[test]
    fn finalize_all_success_is_completed() {
        let run = run_with_calls(3);
        let run = record_and_finalize(run, &[true, true, true], &[0, 1, 2]);
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[test]
    fn finalize_mixed_is_partial_success() {
        let run = run_with_calls(2);
        let run = record_and_finalize(run, &[true, false], &[0, 1]);
        assert_eq!(run.status, RunStatus::PartialSuccess);
    }

    #[test]
    fn finalize_zero_success_is_failed() {
        let run = run_with_calls(2);
        let run = record_and_finalize(run, &[false, false], &[0, 1]);
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[test]
    fn finalize_is_idempotent() {
        let run = run_with_calls(2);
        let once = record_and_finalize(run, &[true, false], &[0, 1]);
        let twice = finalize_run(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn terminal_run_ignores_further_starts() {
        let run = run_with_calls(1);
        let run = record_and_finalize(run, &[false], &[0]);
        let before = run.clone();
        let id = run.steps[0].tool_call.id.clone();
        let run = start_tool_execution(run, &id);
        assert_eq!(run, before);
    }

    // ── serialization ─────────────────────────────────────────────────

    #[test]
    fn run_snapshot_wire_shape() {
        let run = run_with_calls(1);
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["sessionId"], "sess-1");
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["steps"][0]["status"], "pending");
        assert_eq!(json["steps"][0]["toolCall"]["name"], "tool_0");
        assert!(json.get("startedAt").is_none());
        assert!(json.get("parentRunId").is_none());
    }

    #[test]
    fn partial_success_serializes_snake_case() {
        let run = run_with_calls(2);
        let run = record_and_finalize(run, &[true, false], &[0, 1]);
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["status"], "partial_success");
        assert!(json["completedAt"].is_string());
    }

    #[test]
    fn run_roundtrip() {
        let run = run_with_calls(2);
        let run = record_and_finalize(run, &[true, true], &[1, 0]);
        let json = serde_json::to_string(&run).unwrap();
        let back: Run = serde_json::from_str(&json).unwrap();
        assert_eq!(run, back);
    }

    // ── properties ───────────────────────────────────────────────────

    fn outcomes_and_order() -> impl Strategy<Value = (Vec<bool>, Vec<usize>)> {
        prop::collection::vec(any::<bool>(), 1..8).prop_flat_map(|outcomes| {
            let order: Vec<usize> = (0..outcomes.len()).collect();
            (Just(outcomes), Just(order).prop_shuffle())
        })
    }

    proptest! {
        /// Recording order never changes the derived status.
        #[test]
        fn finalize_is_order_independent((outcomes, order) in outcomes_and_order()) {
            let forward: Vec<usize> = (0..outcomes.len()).collect();
            let a = record_and_finalize(run_with_calls(outcomes.len()), &outcomes, &forward);
            let b = record_and_finalize(run_with_calls(outcomes.len()), &outcomes, &order);
            prop_assert_eq!(a.status, b.status);
        }

        /// Finalizing twice equals finalizing once.
        #[test]
        fn finalize_idempotent_for_any_outcomes(outcomes in prop::collection::vec(any::<bool>(), 0..8)) {
            let order: Vec<usize> = (0..outcomes.len()).collect();
            let once = record_and_finalize(run_with_calls(outcomes.len()), &outcomes, &order);
            let twice = finalize_run(once.clone());
            prop_assert_eq!(once, twice);
        }

        /// With any strict subset of results recorded, finalize is a no-op.
        #[test]
        fn finalize_noop_on_partial_recording(
            outcomes in prop::collection::vec(any::<bool>(), 2..8),
            keep in 1usize..7,
        ) {
            let recorded = keep.min(outcomes.len() - 1);
            let order: Vec<usize> = (0..recorded).collect();
            let mut run = run_with_calls(outcomes.len());
            for &i in &order {
                let (id, result) = result_for(&run, i, outcomes[i]);
                run = record_tool_result(run, &id, result);
            }
            let finalized = finalize_run(run.clone());
            prop_assert_eq!(finalized, run);
        }

        /// Derived status matches the outcome multiset table.
        #[test]
        fn finalize_matches_outcome_table(outcomes in prop::collection::vec(any::<bool>(), 0..8)) {
            let order: Vec<usize> = (0..outcomes.len()).collect();
            let run = record_and_finalize(run_with_calls(outcomes.len()), &outcomes, &order);
            let successes = outcomes.iter().filter(|&&b| b).count();
            let expected = if outcomes.is_empty() || successes == 0 {
                RunStatus::Failed
            } else if successes == outcomes.len() {
                RunStatus::Completed
            } else {
                RunStatus::PartialSuccess
            };
            prop_assert_eq!(run.status, expected);
        }
    }
}
