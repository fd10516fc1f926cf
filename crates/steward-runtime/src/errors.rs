//! Runtime error types.
//!
//! Each stage of the pipeline has its own error enum; [`RuntimeError`] is the
//! umbrella at the pipeline boundary. The orchestrator never lets any of
//! these escape as an `Err` — every dispatch failure degrades to a `failed`
//! tool result — so these surface only from plan generation and launcher
//! misuse.

use steward_core::{ActionId, SessionId};
use steward_llm::ProviderError;
use steward_tools::RegistryError;

/// Errors raised while generating or validating a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The structured-output completion itself failed.
    #[error("plan generation failed: {0}")]
    Generation(#[from] ProviderError),

    /// The completion returned a payload that does not match the plan shape.
    #[error("malformed plan payload: {message}")]
    MalformedPlan {
        /// What was wrong with the payload.
        message: String,
    },

    /// The plan references a tool absent from the registry. The whole plan is
    /// rejected, not just the bad step.
    #[error("invalid tool in plan: {name}")]
    UnknownTool {
        /// The unregistered tool name.
        name: String,
    },

    /// The plan exceeds the configured step limit.
    #[error("plan has {count} steps, limit is {max}")]
    TooManySteps {
        /// Steps in the returned plan.
        count: usize,
        /// Configured maximum.
        max: usize,
    },
}

/// Errors raised by action launcher transitions.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The session has no action map.
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    /// No action with this ID in the session.
    #[error("unknown action: {0}")]
    UnknownAction(ActionId),

    /// Execute was requested while required parameters are still missing.
    #[error("action {action_id} is not ready: missing {missing:?}")]
    NotReady {
        /// The action that was not ready.
        action_id: ActionId,
        /// Required parameters still unset.
        missing: Vec<String>,
    },

    /// Execute was requested while a dispatch is already in flight. This is a
    /// client race, not a retry.
    #[error("action {0} is already executing")]
    AlreadyExecuting(ActionId),

    /// A parameter update arrived after the action left the editable states.
    #[error("action {action_id} is {status} and no longer editable")]
    NotEditable {
        /// The action that was edited.
        action_id: ActionId,
        /// Its current status.
        status: &'static str,
    },

    /// The named parameter is not part of the action's schema.
    #[error("action {action_id} has no parameter '{name}'")]
    UnknownParameter {
        /// The action that was edited.
        action_id: ActionId,
        /// The unrecognized parameter name.
        name: String,
    },
}

/// Errors raised while resolving cross-step data placeholders.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No run is tracked for the referenced plan.
    #[error("no run found for plan {plan_id}")]
    UnknownPlan {
        /// The plan the placeholder referenced.
        plan_id: String,
    },

    /// The placeholder references a step index outside the plan.
    #[error("placeholder references step {step} but the plan has {total} steps")]
    StepOutOfRange {
        /// 1-based referenced step number.
        step: usize,
        /// Steps in the plan.
        total: usize,
    },

    /// The referenced step has not recorded a result yet.
    #[error("step {step} has no recorded result yet")]
    ResultNotRecorded {
        /// 1-based referenced step number.
        step: usize,
    },

    /// The referenced path does not exist in the step's result data.
    #[error("path '{path}' not found in step {step} result")]
    MissingPath {
        /// 1-based referenced step number.
        step: usize,
        /// The dotted path that failed to resolve.
        path: String,
    },
}

/// Umbrella error at the runtime pipeline boundary.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Completion provider failure.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Plan generation or validation failure.
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    /// Action launcher transition failure.
    #[error("launch error: {0}")]
    Launch(#[from] LaunchError),

    /// Placeholder resolution failure.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Registry lookup failure.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// No run is tracked under the given ID.
    #[error("unknown run: {0}")]
    UnknownRun(String),

    /// Internal / unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Stable category label for event emission and logs.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Provider(_) => "provider",
            Self::Plan(_) => "plan",
            Self::Launch(_) => "launch",
            Self::Resolve(_) => "resolve",
            Self::Registry(_) => "registry",
            Self::UnknownRun(_) => "unknown_run",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_error_display() {
        let err = PlanError::UnknownTool {
            name: "send_fax".into(),
        };
        assert_eq!(err.to_string(), "invalid tool in plan: send_fax");

        let err = PlanError::TooManySteps { count: 12, max: 10 };
        assert_eq!(err.to_string(), "plan has 12 steps, limit is 10");
    }

    #[test]
    fn launch_error_display() {
        let err = LaunchError::NotReady {
            action_id: ActionId::from("act-1"),
            missing: vec!["to".into()],
        };
        assert_eq!(err.to_string(), "action act-1 is not ready: missing [\"to\"]");

        let err = LaunchError::AlreadyExecuting(ActionId::from("act-1"));
        assert_eq!(err.to_string(), "action act-1 is already executing");

        let err = LaunchError::NotEditable {
            action_id: ActionId::from("act-2"),
            status: "executing",
        };
        assert_eq!(
            err.to_string(),
            "action act-2 is executing and no longer editable"
        );
    }

    #[test]
    fn resolve_error_display() {
        let err = ResolveError::StepOutOfRange { step: 5, total: 2 };
        assert_eq!(
            err.to_string(),
            "placeholder references step 5 but the plan has 2 steps"
        );

        let err = ResolveError::MissingPath {
            step: 2,
            path: "record.id".into(),
        };
        assert_eq!(err.to_string(), "path 'record.id' not found in step 2 result");
    }

    #[test]
    fn runtime_error_categories() {
        assert_eq!(
            RuntimeError::Plan(PlanError::MalformedPlan {
                message: "not an object".into()
            })
            .category(),
            "plan"
        );
        assert_eq!(
            RuntimeError::Launch(LaunchError::UnknownAction(ActionId::from("a"))).category(),
            "launch"
        );
        assert_eq!(RuntimeError::Internal("x".into()).category(), "internal");
        assert_eq!(RuntimeError::UnknownRun("r".into()).category(), "unknown_run");
    }

    #[test]
    fn conversions_into_umbrella() {
        let plan: RuntimeError = PlanError::MalformedPlan {
            message: "bad".into(),
        }
        .into();
        assert!(matches!(plan, RuntimeError::Plan(_)));

        let launch: RuntimeError = LaunchError::UnknownSession(SessionId::from("s")).into();
        assert!(matches!(launch, RuntimeError::Launch(_)));

        let resolve: RuntimeError = ResolveError::ResultNotRecorded { step: 1 }.into();
        assert!(matches!(resolve, RuntimeError::Resolve(_)));
    }
}
