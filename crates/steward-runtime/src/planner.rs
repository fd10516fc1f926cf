//! Planner — one structured-output call, whole-plan validation.
//!
//! The planner turns a user turn (plus tool calls the aggregator already
//! surfaced, treated as hints) into an ordered, registry-validated
//! [`ActionStep`] list. Validation fails closed: a plan referencing even one
//! unknown tool is rejected entirely, because a partially-valid plan executed
//! live could perform unintended side effects. There are no retries here —
//! a failed generation is the caller's to narrate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use steward_core::{StepId, ToolCall};
use steward_llm::{
    ChatMessage, CompletionProvider, CompletionRequest, ResponseFormat, ToolFunction,
};
use steward_tools::ToolRegistry;
use tracing::{debug, instrument, warn};

use crate::errors::PlanError;

/// Execution status of a plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStepStatus {
    /// Validated and waiting for launch.
    Ready,
    /// Dispatch in flight.
    Executing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

/// One step of a validated plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStep {
    /// Fresh step ID assigned on acceptance.
    pub id: StepId,
    /// What the step is meant to accomplish, in the model's words.
    pub intent: String,
    /// Registered tool the step invokes.
    pub tool: String,
    /// Arguments the model proposed.
    pub arguments: Map<String, Value>,
    /// Step status; `ready` on acceptance.
    pub status: ActionStepStatus,
    /// Zero-based position within the plan.
    pub step_index: usize,
    /// Number of steps in the plan.
    pub total_steps: usize,
}

/// Raw payload shape the model is constrained to return.
#[derive(Debug, Deserialize)]
struct RawPlan {
    plan: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    intent: String,
    tool: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

/// Generates validated action plans through a structured-output completion.
pub struct Planner {
    provider: Arc<dyn CompletionProvider>,
    registry: Arc<ToolRegistry>,
    model: String,
    max_steps: usize,
}

impl Planner {
    /// Planner using the given provider, registry, and limits.
    #[must_use]
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        registry: Arc<ToolRegistry>,
        model: impl Into<String>,
        max_steps: usize,
    ) -> Self {
        Self {
            provider,
            registry,
            model: model.into(),
            max_steps,
        }
    }

    /// Produce a validated, ordered plan for the user turn.
    ///
    /// `hinted_tool_calls` are tool calls the aggregator surfaced; they bias
    /// the model but do not bypass validation. Any error leaves no plan — the
    /// caller decides what to narrate.
    #[instrument(skip_all, fields(model = %self.model, hints = hinted_tool_calls.len()))]
    pub async fn generate_plan(
        &self,
        user_input: &str,
        hinted_tool_calls: &[ToolCall],
    ) -> Result<Vec<ActionStep>, PlanError> {
        let request = self.build_request(user_input, hinted_tool_calls);
        let payload = self.provider.complete_json(&request).await?;

        let raw: RawPlan = serde_json::from_value(payload).map_err(|error| {
            warn!(error = %error, "plan payload did not match the expected shape");
            PlanError::MalformedPlan {
                message: error.to_string(),
            }
        })?;

        if raw.plan.len() > self.max_steps {
            return Err(PlanError::TooManySteps {
                count: raw.plan.len(),
                max: self.max_steps,
            });
        }

        // Fail closed on the first unknown tool; nothing is accepted.
        for step in &raw.plan {
            if !self.registry.contains(&step.tool) {
                warn!(tool = %step.tool, "plan rejected: unknown tool");
                return Err(PlanError::UnknownTool {
                    name: step.tool.clone(),
                });
            }
        }

        let total_steps = raw.plan.len();
        let steps: Vec<ActionStep> = raw
            .plan
            .into_iter()
            .enumerate()
            .map(|(step_index, step)| ActionStep {
                id: StepId::new(),
                intent: step.intent,
                tool: step.tool,
                arguments: step.arguments,
                status: ActionStepStatus::Ready,
                step_index,
                total_steps,
            })
            .collect();

        debug!(steps = steps.len(), "plan accepted");
        Ok(steps)
    }

    fn build_request(&self, user_input: &str, hints: &[ToolCall]) -> CompletionRequest {
        let tool_list: String = self
            .registry
            .names()
            .iter()
            .filter_map(|name| self.registry.get(name))
            .map(|tool| format!("- {}: {}\n", tool.name, tool.description))
            .collect();

        let system_prompt = format!(
            "You are an action planner. Turn the user's request into an ordered plan \
             of tool invocations. Respond with a single JSON object of the shape \
             {{\"plan\": [{{\"intent\": string, \"tool\": string, \"arguments\": object}}]}}. \
             Use only these tools:\n{tool_list}\
             Return {{\"plan\": []}} if no tool applies."
        );

        let mut user_content = user_input.to_string();
        if !hints.is_empty() {
            let hint_lines: String = hints
                .iter()
                .map(|call| {
                    format!(
                        "- {} {}\n",
                        call.name,
                        Value::Object(call.arguments.clone())
                    )
                })
                .collect();
            user_content.push_str(&format!(
                "\n\nTool calls already identified for this request (verify and order \
                 them, adding any that are missing):\n{hint_lines}"
            ));
        }

        let tools = self
            .registry
            .iter()
            .map(|tool| ToolFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema(),
            })
            .collect();

        CompletionRequest::new(&self.model)
            .with_system_prompt(system_prompt)
            .with_message(ChatMessage::user(user_content))
            .with_tools(tools)
            .with_response_format(ResponseFormat::JsonObject)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
