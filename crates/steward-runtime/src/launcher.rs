//! Action launcher — per-session parameter collection and execution gate.
//!
//! Every plan step becomes a [`LaunchableAction`]: a client-facing state
//! machine that tracks which parameters are still missing, accepts edits,
//! and gates execution on readiness. States:
//!
//! `collecting_parameters -> ready -> executing -> {completed | failed}`
//!
//! with a back-edge from `ready` to `collecting_parameters` when an edit
//! clears a previously-satisfied required field. Transitions for one
//! `(session, action)` pair serialize through a per-action async mutex;
//! sessions are independent entries in a concurrent map.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use steward_core::{
    ActionId, ConfirmationPrompt, MessageId, NarrationBase, NarrationEvent, SessionId, ToolCall,
    ToolCallId, ToolResult, UserId,
};
use steward_tools::{value_is_present, ParameterType, Requirement, ToolDefinition};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::emitter::NarrationEmitter;
use crate::errors::LaunchError;

/// Aggregate status of a launchable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Required parameters are still missing.
    CollectingParameters,
    /// Every required parameter is satisfied; awaiting confirmation.
    Ready,
    /// Dispatch in flight.
    Executing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl ActionStatus {
    /// Stable string form (matches the serialized representation).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CollectingParameters => "collecting_parameters",
            Self::Ready => "ready",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// One parameter of a launchable action, as shown to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParameter {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub kind: ParameterType,
    /// Whether the parameter participates in requirement rules.
    pub required: bool,
    /// Current value, if one is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Whether the parameter is currently in the missing set.
    pub missing: bool,
}

/// Client-facing snapshot of one action's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchableAction {
    /// Action ID.
    pub id: ActionId,
    /// Tool call this action will dispatch as.
    pub tool_call_id: ToolCallId,
    /// Tool the action invokes.
    pub tool_name: String,
    /// Human-readable description of the step's intent.
    pub description: String,
    /// Ordered parameter list.
    pub parameters: Vec<ActionParameter>,
    /// Aggregate status.
    pub status: ActionStatus,
    /// Execution result, present once terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolResult>,
    /// Error message when the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a parameter update.
#[derive(Debug, Clone)]
pub struct ParameterUpdate {
    /// Snapshot after the update.
    pub action: LaunchableAction,
    /// Whether this update transitioned the action into `ready`.
    pub became_ready: bool,
}

/// Mutable state behind each action's lock.
struct ActionEntry {
    definition: ToolDefinition,
    session_id: SessionId,
    user_id: UserId,
    arguments: Map<String, Value>,
    action: LaunchableAction,
}

impl ActionEntry {
    /// Recompute missing flags and status from the current arguments.
    /// Returns `true` when this recomputation moved the action into `ready`.
    fn refresh(&mut self) -> bool {
        let missing = self.definition.missing_parameters(&self.arguments);
        for parameter in &mut self.action.parameters {
            parameter.value = self.arguments.get(&parameter.name).cloned();
            parameter.missing = missing.contains(&parameter.name);
        }
        let was_ready = self.action.status == ActionStatus::Ready;
        self.action.status = if missing.is_empty() {
            ActionStatus::Ready
        } else {
            ActionStatus::CollectingParameters
        };
        !was_ready && self.action.status == ActionStatus::Ready
    }
}

type SessionActions = Vec<(ActionId, Arc<Mutex<ActionEntry>>)>;

/// Per-session store of launchable actions.
pub struct ActionLauncher {
    sessions: DashMap<SessionId, SessionActions>,
    emitter: Arc<NarrationEmitter>,
}

impl ActionLauncher {
    /// Launcher emitting readiness notifications through the given channel.
    #[must_use]
    pub fn new(emitter: Arc<NarrationEmitter>) -> Self {
        Self {
            sessions: DashMap::new(),
            emitter,
        }
    }

    /// Create an action for a tool call against its definition.
    ///
    /// The missing set is computed from the definition's requirement rules;
    /// the action starts in `collecting_parameters` if anything required is
    /// absent, `ready` otherwise. No readiness notification fires here —
    /// actions created ready are surfaced in a batch by the caller.
    #[instrument(skip_all, fields(session_id = %call.session_id, tool_name = %call.name))]
    pub fn create_action(
        &self,
        definition: &ToolDefinition,
        call: &ToolCall,
        description: impl Into<String>,
    ) -> LaunchableAction {
        let missing = definition.missing_parameters(&call.arguments);
        let parameters = definition
            .parameters
            .iter()
            .map(|spec| ActionParameter {
                name: spec.name.clone(),
                kind: spec.kind,
                required: spec.requirement != Requirement::Optional,
                value: call.arguments.get(&spec.name).cloned(),
                missing: missing.contains(&spec.name),
            })
            .collect();
        let status = if missing.is_empty() {
            ActionStatus::Ready
        } else {
            ActionStatus::CollectingParameters
        };

        let action = LaunchableAction {
            id: ActionId::new(),
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            description: description.into(),
            parameters,
            status,
            result: None,
            error: None,
        };
        debug!(action_id = %action.id, status = status.as_str(), "action created");

        let entry = ActionEntry {
            definition: definition.clone(),
            session_id: call.session_id.clone(),
            user_id: call.user_id.clone(),
            arguments: call.arguments.clone(),
            action: action.clone(),
        };
        self.sessions
            .entry(call.session_id.clone())
            .or_default()
            .push((action.id.clone(), Arc::new(Mutex::new(entry))));
        action
    }

    fn entry(
        &self,
        session_id: &SessionId,
        action_id: &ActionId,
    ) -> Result<Arc<Mutex<ActionEntry>>, LaunchError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| LaunchError::UnknownSession(session_id.clone()))?;
        session
            .iter()
            .find(|(id, _)| id == action_id)
            .map(|(_, entry)| Arc::clone(entry))
            .ok_or_else(|| LaunchError::UnknownAction(action_id.clone()))
    }

    /// Current snapshot of one action.
    pub async fn snapshot(
        &self,
        session_id: &SessionId,
        action_id: &ActionId,
    ) -> Result<LaunchableAction, LaunchError> {
        let entry = self.entry(session_id, action_id)?;
        let guard = entry.lock().await;
        Ok(guard.action.clone())
    }

    /// Set or clear a parameter value and recompute readiness.
    ///
    /// A transition into `ready` fires exactly one readiness notification:
    /// the edge triggers it, not the level, so further edits that keep the
    /// action ready stay silent.
    #[instrument(skip_all, fields(session_id = %session_id, action_id = %action_id, parameter = name))]
    pub async fn update_parameter(
        &self,
        session_id: &SessionId,
        action_id: &ActionId,
        name: &str,
        value: Value,
    ) -> Result<ParameterUpdate, LaunchError> {
        let entry = self.entry(session_id, action_id)?;
        let mut guard = entry.lock().await;

        match guard.action.status {
            ActionStatus::CollectingParameters | ActionStatus::Ready => {}
            status @ (ActionStatus::Executing | ActionStatus::Completed | ActionStatus::Failed) => {
                return Err(LaunchError::NotEditable {
                    action_id: action_id.clone(),
                    status: status.as_str(),
                });
            }
        }
        if guard.definition.parameter(name).is_none() {
            return Err(LaunchError::UnknownParameter {
                action_id: action_id.clone(),
                name: name.to_string(),
            });
        }

        // An empty value clears the parameter; requirement checks treat a
        // cleared field the same as a never-set one.
        if value_is_present(&value) {
            let _ = guard.arguments.insert(name.to_string(), value);
        } else {
            let _ = guard.arguments.remove(name);
        }

        let became_ready = guard.refresh();
        debug!(
            status = guard.action.status.as_str(),
            became_ready, "parameter updated"
        );
        if became_ready {
            let message_id = MessageId::from(action_id.as_str());
            let _ = self.emitter.emit(NarrationEvent::ReadyForConfirmation {
                base: NarrationBase::chunk(&message_id, None),
                content: ConfirmationPrompt {
                    prompt: ready_prompt(std::slice::from_ref(&guard.action)),
                    action_ids: vec![action_id.clone()],
                },
            });
        }

        Ok(ParameterUpdate {
            action: guard.action.clone(),
            became_ready,
        })
    }

    /// All `ready` actions in the session, in creation order.
    pub async fn ready_actions(&self, session_id: &SessionId) -> Vec<LaunchableAction> {
        let Some(session) = self.sessions.get(session_id) else {
            return Vec::new();
        };
        let entries: Vec<Arc<Mutex<ActionEntry>>> =
            session.iter().map(|(_, entry)| Arc::clone(entry)).collect();
        drop(session);

        let mut ready = Vec::new();
        for entry in entries {
            let guard = entry.lock().await;
            if guard.action.status == ActionStatus::Ready {
                ready.push(guard.action.clone());
            }
        }
        ready
    }

    /// Surface every ready action in one batch confirmation prompt.
    ///
    /// Multi-step plans propose several actions at once; the caller approves
    /// the batch rather than confirming one at a time. Returns the prompt
    /// when at least one action is ready.
    pub async fn surface_ready_batch(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
    ) -> Option<ConfirmationPrompt> {
        let ready = self.ready_actions(session_id).await;
        if ready.is_empty() {
            return None;
        }
        let prompt = ConfirmationPrompt {
            prompt: ready_prompt(&ready),
            action_ids: ready.iter().map(|action| action.id.clone()).collect(),
        };
        let _ = self.emitter.emit(NarrationEvent::ReadyForConfirmation {
            base: NarrationBase::chunk(message_id, None),
            content: prompt.clone(),
        });
        Some(prompt)
    }

    /// Execute a ready action through the given dispatch function.
    ///
    /// Only legal from `ready`: a concurrent execute while the action is
    /// already `executing` is a client race and is rejected, as is execution
    /// with parameters still missing. The dispatched tool call carries the
    /// action's own stored arguments, never caller-supplied overrides. The
    /// per-action lock is released during dispatch so parameter-update
    /// rejections (not deadlocks) are what a racing client observes.
    #[instrument(skip_all, fields(session_id = %session_id, action_id = %action_id))]
    pub async fn execute<F, Fut>(
        &self,
        session_id: &SessionId,
        action_id: &ActionId,
        dispatch: F,
    ) -> Result<ToolResult, LaunchError>
    where
        F: FnOnce(ToolCall) -> Fut,
        Fut: std::future::Future<Output = ToolResult> + Send,
    {
        let entry = self.entry(session_id, action_id)?;

        let call = {
            let mut guard = entry.lock().await;
            match guard.action.status {
                ActionStatus::Ready => {}
                ActionStatus::Executing => {
                    return Err(LaunchError::AlreadyExecuting(action_id.clone()));
                }
                ActionStatus::CollectingParameters => {
                    let missing = guard
                        .action
                        .parameters
                        .iter()
                        .filter(|p| p.missing)
                        .map(|p| p.name.clone())
                        .collect();
                    return Err(LaunchError::NotReady {
                        action_id: action_id.clone(),
                        missing,
                    });
                }
                status @ (ActionStatus::Completed | ActionStatus::Failed) => {
                    return Err(LaunchError::NotEditable {
                        action_id: action_id.clone(),
                        status: status.as_str(),
                    });
                }
            }
            guard.action.status = ActionStatus::Executing;
            ToolCall {
                id: guard.action.tool_call_id.clone(),
                name: guard.action.tool_name.clone(),
                arguments: guard.arguments.clone(),
                session_id: guard.session_id.clone(),
                user_id: guard.user_id.clone(),
            }
        };

        debug!(tool_name = %call.name, "action dispatching");
        let result = dispatch(call).await;

        let mut guard = entry.lock().await;
        if result.is_success() {
            guard.action.status = ActionStatus::Completed;
            guard.action.error = None;
        } else {
            guard.action.status = ActionStatus::Failed;
            guard.action.error.clone_from(&result.error);
        }
        guard.action.result = Some(result.clone());
        debug!(status = guard.action.status.as_str(), "action finished");
        Ok(result)
    }

    /// Remove every action belonging to the session.
    pub fn clear_session(&self, session_id: &SessionId) {
        if self.sessions.remove(session_id).is_some() {
            debug!(session_id = %session_id, "session actions cleared");
        }
    }

    /// Number of actions tracked for the session.
    #[must_use]
    pub fn action_count(&self, session_id: &SessionId) -> usize {
        self.sessions
            .get(session_id)
            .map_or(0, |session| session.len())
    }
}

/// Synthesize the confirmation prompt covering a batch of ready actions.
fn ready_prompt(actions: &[LaunchableAction]) -> String {
    let descriptions: Vec<&str> = actions
        .iter()
        .map(|action| {
            if action.description.is_empty() {
                action.tool_name.as_str()
            } else {
                action.description.as_str()
            }
        })
        .collect();
    if descriptions.len() == 1 {
        format!("Ready to run: {}. Confirm to proceed.", descriptions[0])
    } else {
        format!(
            "Ready to run {} actions: {}. Confirm to run them all.",
            descriptions.len(),
            descriptions.join("; ")
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
