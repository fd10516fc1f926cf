//! Turn runner — the full pipeline for one user turn.
//!
//! A turn flows through four stages: fan out the role streams and aggregate
//! them ([`crate::aggregator`]), generate and validate a plan
//! ([`crate::planner`]), materialize the plan as a run plus launchable
//! actions ([`crate::run_store`], [`crate::launcher`]), and — once the user
//! confirms — drive the actions through the dispatch pipeline
//! ([`crate::orchestrator`]). The runner owns the wiring; each stage owns its
//! semantics.
//!
//! Plan failures do not fail the turn: the narration already streamed, so a
//! rejected plan becomes a `plan_rejected` event and the turn ends with no
//! run. Cancellation observed during streaming skips planning entirely.

use std::sync::Arc;

use steward_core::{
    create_run, stream_error_event, ConfirmationPrompt, MessageId, NarrationBase, NarrationEvent,
    Run, RunId, SessionId, StreamRole, ToolCall, UserId,
};
use steward_llm::{ChatMessage, CompletionProvider, CompletionRequest, ToolFunction};
use steward_settings::StewardSettings;
use steward_tools::{
    ActionConnector, ConnectionLookup, ProviderKeyLookup, SanitizeOptions, ToolRegistry,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::{AggregatedTurn, StreamAggregator, StreamInput};
use crate::emitter::NarrationEmitter;
use crate::errors::RuntimeError;
use crate::launcher::{ActionLauncher, LaunchableAction};
use crate::orchestrator::ToolOrchestrator;
use crate::planner::{ActionStep, Planner};
use crate::resolve::RunLedgerResolver;
use crate::run_store::RunStore;

/// Per-turn options.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnOptions {
    /// Open the optional artifact stream alongside the two core streams.
    pub artifact_stream: bool,
}

/// Everything one turn produced.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Message the narration was attributed to.
    pub message_id: MessageId,
    /// Aggregated stream results.
    pub turn: AggregatedTurn,
    /// Accepted plan steps; empty when planning was skipped or rejected.
    pub plan: Vec<ActionStep>,
    /// Why the plan was rejected, when it was.
    pub plan_rejection: Option<String>,
    /// The tracked run, present when a non-empty plan was accepted.
    pub run: Option<Run>,
    /// Launchable actions created from the plan, in step order.
    pub actions: Vec<LaunchableAction>,
    /// The batch confirmation prompt, when any action started ready.
    pub confirmation: Option<ConfirmationPrompt>,
}

/// Owns the orchestration pipeline for a session's turns.
pub struct TurnRunner {
    settings: StewardSettings,
    provider: Arc<dyn CompletionProvider>,
    registry: Arc<ToolRegistry>,
    emitter: Arc<NarrationEmitter>,
    aggregator: StreamAggregator,
    planner: Planner,
    launcher: Arc<ActionLauncher>,
    orchestrator: Arc<ToolOrchestrator>,
    run_store: Arc<RunStore>,
}

impl TurnRunner {
    /// Wire the full pipeline from its external collaborators.
    #[must_use]
    pub fn new(
        settings: StewardSettings,
        provider: Arc<dyn CompletionProvider>,
        registry: Arc<ToolRegistry>,
        connector: Arc<dyn ActionConnector>,
        provider_keys: Arc<dyn ProviderKeyLookup>,
        connections: Arc<dyn ConnectionLookup>,
    ) -> Self {
        let emitter = Arc::new(NarrationEmitter::new(settings.narration.channel_capacity));
        let run_store = Arc::new(RunStore::new(Arc::clone(&emitter)));
        let launcher = Arc::new(ActionLauncher::new(Arc::clone(&emitter)));
        let orchestrator = Arc::new(ToolOrchestrator::new(
            Arc::clone(&registry),
            connector,
            provider_keys,
            connections,
            Arc::new(RunLedgerResolver::new(Arc::clone(&run_store))),
            Arc::clone(&run_store),
            SanitizeOptions {
                page_size_floor: settings.sanitize.page_size_floor,
                page_size_ceiling: settings.sanitize.page_size_ceiling,
            },
        ));
        let planner = Planner::new(
            Arc::clone(&provider),
            Arc::clone(&registry),
            settings.models.planner.clone(),
            settings.planner.max_steps,
        );
        let aggregator = StreamAggregator::new(Arc::clone(&emitter));

        Self {
            settings,
            provider,
            registry,
            emitter,
            aggregator,
            planner,
            launcher,
            orchestrator,
            run_store,
        }
    }

    /// Subscribe to the turn's narration events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NarrationEvent> {
        self.emitter.subscribe()
    }

    /// The action launcher, for parameter edits between turn and confirm.
    #[must_use]
    pub fn launcher(&self) -> &Arc<ActionLauncher> {
        &self.launcher
    }

    /// The run ledger.
    #[must_use]
    pub fn run_store(&self) -> &Arc<RunStore> {
        &self.run_store
    }

    /// Run one user turn: stream, aggregate, plan, and stage actions.
    ///
    /// Never errors: stream failures and plan rejections are narrated and
    /// reflected in the outcome. Execution does not start here — actions wait
    /// for [`confirm_and_execute`](Self::confirm_and_execute).
    #[instrument(skip_all, fields(session_id = %session_id, user_id = %user_id))]
    pub async fn run_turn(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        user_input: &str,
        options: TurnOptions,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let message_id = MessageId::new();

        let mut roles = vec![StreamRole::Conversational, StreamRole::ToolIdentification];
        if options.artifact_stream {
            roles.push(StreamRole::Artifact);
        }
        let streams = self.open_streams(&roles, user_input, &message_id).await;
        let turn = self
            .aggregator
            .run_turn(session_id, user_id, &message_id, streams, cancel)
            .await;

        // A disconnected client gets no plan and no staged actions.
        if turn.cancelled {
            debug!("turn cancelled during streaming; skipping planning");
            return TurnOutcome {
                message_id,
                turn,
                plan: Vec::new(),
                plan_rejection: None,
                run: None,
                actions: Vec::new(),
                confirmation: None,
            };
        }

        let plan = match self.planner.generate_plan(user_input, &turn.tool_calls).await {
            Ok(plan) => plan,
            Err(error) => {
                warn!(error = %error, "plan rejected");
                let reason = error.to_string();
                let _ = self.emitter.emit(NarrationEvent::PlanRejected {
                    base: NarrationBase::terminal(&message_id, None),
                    content: format!("I couldn't put together an action plan: {reason}"),
                });
                return TurnOutcome {
                    message_id,
                    turn,
                    plan: Vec::new(),
                    plan_rejection: Some(reason),
                    run: None,
                    actions: Vec::new(),
                    confirmation: None,
                };
            }
        };

        if plan.is_empty() {
            debug!("empty plan; nothing to stage");
            return TurnOutcome {
                message_id,
                turn,
                plan,
                plan_rejection: None,
                run: None,
                actions: Vec::new(),
                confirmation: None,
            };
        }

        // One tool call per step, shared between the run's steps and the
        // launchable actions so results correlate by tool call ID.
        let calls: Vec<ToolCall> = plan
            .iter()
            .map(|step| {
                ToolCall::new(
                    &step.tool,
                    step.arguments.clone(),
                    session_id.clone(),
                    user_id.clone(),
                )
            })
            .collect();

        let mut actions = Vec::with_capacity(plan.len());
        for (step, call) in plan.iter().zip(&calls) {
            // Plan validation already checked every tool against the registry.
            if let Some(definition) = self.registry.get(&step.tool) {
                actions.push(self.launcher.create_action(definition, call, &step.intent));
            }
        }

        let run = self
            .run_store
            .insert(create_run(session_id, user_id, user_input, calls));
        let confirmation = self.launcher.surface_ready_batch(session_id, &message_id).await;

        info!(
            run_id = %run.id,
            steps = plan.len(),
            ready = confirmation.as_ref().map_or(0, |c| c.action_ids.len()),
            "turn staged"
        );

        TurnOutcome {
            message_id,
            turn,
            plan,
            plan_rejection: None,
            run: Some(run),
            actions,
            confirmation,
        }
    }

    /// Execute every ready action of the run, in step order, then finalize.
    ///
    /// Actions still collecting parameters are skipped; the run stays open
    /// until their results arrive (finalization is all-or-nothing). A cancel
    /// observed between steps stops dispatching further ones.
    #[instrument(skip_all, fields(session_id = %session_id, run_id = %run_id))]
    pub async fn confirm_and_execute(
        &self,
        session_id: &SessionId,
        run_id: &RunId,
        cancel: &CancellationToken,
    ) -> Result<Run, RuntimeError> {
        let run = self
            .run_store
            .get(run_id)
            .ok_or_else(|| RuntimeError::UnknownRun(run_id.to_string()))?;

        let ready = self.launcher.ready_actions(session_id).await;
        for step in &run.steps {
            if cancel.is_cancelled() {
                debug!("cancel observed between steps; stopping execution");
                break;
            }
            let Some(action) = ready
                .iter()
                .find(|action| action.tool_call_id == step.tool_call.id)
            else {
                continue;
            };

            let orchestrator = Arc::clone(&self.orchestrator);
            let plan_id = run.plan_id.clone();
            match self
                .launcher
                .execute(session_id, &action.id, move |call| async move {
                    orchestrator.execute_tool(&call, &plan_id).await
                })
                .await
            {
                Ok(result) => {
                    debug!(tool_name = %step.tool_call.name, success = result.is_success(), "step executed");
                }
                // A concurrent confirm already drives this action; its
                // outcome will land in the ledger either way.
                Err(race) => warn!(error = %race, "skipping action"),
            }
        }

        self.run_store
            .finalize(run_id)
            .ok_or_else(|| RuntimeError::UnknownRun(run_id.to_string()))
    }

    /// Drop all per-session state: staged actions and tracked runs.
    pub fn clear_session(&self, session_id: &SessionId) {
        self.launcher.clear_session(session_id);
        self.run_store.clear_session(session_id);
        info!(session_id = %session_id, "session state cleared");
    }

    /// Open one provider stream per role, concurrently.
    ///
    /// A stream that fails to open is narrated as a `stream_error` and the
    /// turn proceeds with the streams that did open.
    async fn open_streams(
        &self,
        roles: &[StreamRole],
        user_input: &str,
        message_id: &MessageId,
    ) -> Vec<StreamInput> {
        let opens = roles.iter().map(|&role| {
            let request = self.build_request(role, user_input);
            async move { (role, self.provider.stream(&request).await) }
        });

        let mut streams: Vec<StreamInput> = Vec::with_capacity(roles.len());
        for (role, opened) in futures::future::join_all(opens).await {
            match opened {
                Ok(stream) => streams.push(StreamInput { role, stream }),
                Err(error) => {
                    warn!(role = %role, error = %error, "failed to open stream");
                    let _ = self.emitter.emit(stream_error_event(
                        message_id,
                        role,
                        error.to_string(),
                    ));
                }
            }
        }
        streams
    }

    fn build_request(&self, role: StreamRole, user_input: &str) -> CompletionRequest {
        let mut request = CompletionRequest::new(self.settings.models.for_role(role))
            .with_system_prompt(self.settings.prompts.for_role(role))
            .with_message(ChatMessage::user(user_input));

        // Only the tool-identification stream is offered the catalog.
        if role == StreamRole::ToolIdentification {
            request = request.with_tools(
                self.registry
                    .iter()
                    .map(|tool| ToolFunction {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.input_schema(),
                    })
                    .collect(),
            );
        }
        request
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
