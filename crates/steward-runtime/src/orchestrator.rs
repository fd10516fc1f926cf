//! Tool orchestrator — the dispatch pipeline between a tool call and the
//! external connector.
//!
//! Pipeline per call: look up the tool, resolve cross-step placeholders,
//! sanitize arguments, resolve the provider capability and the user's live
//! connection, dispatch through the connector, interpret the raw payload.
//! Every failure anywhere in the pipeline degrades to a `failed`
//! [`ToolResult`] rather than an `Err` — one bad step must not take down the
//! run, it becomes a recorded failure the run finalizes over.
//!
//! Execution start and the terminal result are both recorded into the run
//! ledger here; there is a single recording point, so no code path can skip
//! the ledger and leave the run unfinalized forever.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use steward_core::{PlanId, ToolCall, ToolResult};
use steward_tools::{
    failure_message, sanitize_arguments, truncated_payload, ActionConnector, ConnectionLookup,
    ProviderKeyLookup, SanitizeOptions, ToolRegistry,
};
use tracing::{debug, instrument, warn};

use crate::resolve::StepResolver;
use crate::run_store::RunStore;

/// Executes tool calls through the connector, recording into the run ledger.
pub struct ToolOrchestrator {
    registry: Arc<ToolRegistry>,
    connector: Arc<dyn ActionConnector>,
    provider_keys: Arc<dyn ProviderKeyLookup>,
    connections: Arc<dyn ConnectionLookup>,
    resolver: Arc<dyn StepResolver>,
    run_store: Arc<RunStore>,
    sanitize: SanitizeOptions,
}

impl ToolOrchestrator {
    /// Orchestrator wired to its collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        connector: Arc<dyn ActionConnector>,
        provider_keys: Arc<dyn ProviderKeyLookup>,
        connections: Arc<dyn ConnectionLookup>,
        resolver: Arc<dyn StepResolver>,
        run_store: Arc<RunStore>,
        sanitize: SanitizeOptions,
    ) -> Self {
        Self {
            registry,
            connector,
            provider_keys,
            connections,
            resolver,
            run_store,
            sanitize,
        }
    }

    /// Execute one tool call and record its outcome into the plan's run.
    ///
    /// Infallible by construction: the returned result is `failed` when any
    /// pipeline stage goes wrong, with the stage's message as the error.
    #[instrument(skip_all, fields(tool_name = %call.name, tool_call_id = %call.id))]
    pub async fn execute_tool(&self, call: &ToolCall, plan_id: &PlanId) -> ToolResult {
        let run_id = self.run_store.get_by_plan(plan_id).map(|run| run.id);
        if let Some(run_id) = &run_id {
            let _ = self.run_store.start_step(run_id, &call.id);
        }

        let result = self.dispatch(call, plan_id).await;
        if result.is_success() {
            debug!("tool execution succeeded");
        } else {
            warn!(error = result.error.as_deref(), "tool execution failed");
        }

        if let Some(run_id) = &run_id {
            let _ = self.run_store.record_result(run_id, &call.id, result.clone());
        }
        result
    }

    async fn dispatch(&self, call: &ToolCall, plan_id: &PlanId) -> ToolResult {
        let Some(definition) = self.registry.get(&call.name) else {
            return ToolResult::failed(&call.name, format!("unknown tool: {}", call.name));
        };

        let resolved = match self.resolver.resolve(plan_id, &call.arguments) {
            Ok(resolved) => resolved,
            Err(error) => return ToolResult::failed(&call.name, error.to_string()),
        };
        let sanitized = sanitize_arguments(resolved, &self.sanitize);

        let provider_key = self
            .provider_keys
            .provider_key(&call.user_id, &call.name)
            .await
            .unwrap_or_else(|| definition.provider_key.clone());
        let Some(connection_id) = self
            .connections
            .connection_id(&call.user_id, &provider_key)
            .await
        else {
            return ToolResult::failed(
                &call.name,
                format!("no active connection for provider '{provider_key}'"),
            );
        };

        debug!(provider_key = %provider_key, "dispatching to connector");
        match self
            .connector
            .execute(&provider_key, &connection_id, &call.name, &sanitized)
            .await
        {
            Ok(raw) => interpret_payload(&call.name, raw),
            Err(error) => ToolResult::failed(&call.name, error.to_string()),
        }
    }
}

/// Turn the connector's raw payload into a tool result.
///
/// Three shapes: an explicit failure envelope becomes `failed` with its
/// message; a truncation envelope becomes a `success` result whose data
/// carries the raw text (and a best-effort repaired value when the truncated
/// JSON can be closed); anything else is a plain success.
fn interpret_payload(tool_name: &str, raw: Value) -> ToolResult {
    if let Some(message) = failure_message(&raw) {
        return ToolResult::failed(tool_name, message);
    }

    if let Some(text) = truncated_payload(&raw) {
        warn!(tool_name, length = text.len(), "connector response was truncated");
        let mut data = Map::new();
        let _ = data.insert("error".to_string(), json!("response truncated"));
        let _ = data.insert("raw".to_string(), json!(text));
        if let Some(repaired) = repair_truncated_json(text) {
            let _ = data.insert("repaired".to_string(), repaired);
        }
        // Truncation is degraded data, not a failed action: the provider did
        // act, so the step must not count against the run.
        return ToolResult::success(tool_name, Value::Object(data));
    }

    ToolResult::success(tool_name, raw)
}

/// Best-effort close of a truncated JSON document.
///
/// Tracks string state and the open brace/bracket stack, closes an unclosed
/// string, patches a dangling `key:` or trailing comma, then appends the
/// missing closers. Returns `None` when the patched text still fails to
/// parse; callers keep the raw text either way.
fn repair_truncated_json(text: &str) -> Option<Value> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => stack.push(c),
            '}' | ']' if !in_string => {
                let _ = stack.pop();
            }
            _ => {}
        }
    }
    if stack.is_empty() && !in_string {
        // Balanced already; only worth returning if it parses.
        return serde_json::from_str(text).ok();
    }

    let mut candidate = text.trim_end().to_string();
    if in_string {
        candidate.push('"');
    }
    let tail = candidate.trim_end();
    if tail.ends_with(':') {
        candidate.push_str("null");
    } else if tail.ends_with(',') {
        candidate.truncate(tail.len() - 1);
    }
    for opener in stack.iter().rev() {
        candidate.push(if *opener == '{' { '}' } else { ']' });
    }
    serde_json::from_str(&candidate).ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
