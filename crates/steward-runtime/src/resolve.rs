//! Cross-step data flow: `{{step_N.path}}` placeholder resolution.
//!
//! Plan steps reference earlier results with placeholders like
//! `{{step_1.records.0.email}}`. Before a step dispatches, its arguments are
//! walked and every placeholder is replaced with data from the referenced
//! step's recorded result. Step numbers are 1-based positions in the plan;
//! the path after the step number navigates the result's `data` payload
//! (object keys and array indices).
//!
//! A string that is exactly one placeholder resolves to the referenced value
//! with its JSON type intact; a placeholder embedded in a longer string is
//! rendered into it as text. Resolution is strict: a reference to a step
//! that is out of range, unrecorded, or missing the path fails the step
//! rather than dispatching with a half-resolved argument.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use steward_core::{PlanId, Run};

use crate::errors::ResolveError;
use crate::run_store::RunStore;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{step_(\d+)((?:\.[A-Za-z0-9_]+)*)\}\}").expect("placeholder regex is valid")
});

/// Whether any value in the argument object contains a step placeholder.
#[must_use]
pub fn contains_placeholders(arguments: &Map<String, Value>) -> bool {
    fn scan(value: &Value) -> bool {
        match value {
            Value::String(s) => PLACEHOLDER.is_match(s),
            Value::Array(items) => items.iter().any(scan),
            Value::Object(map) => map.values().any(scan),
            _ => false,
        }
    }
    arguments.values().any(scan)
}

/// Resolve every placeholder in `arguments` against the run's recorded
/// step results.
pub fn resolve_against_run(
    run: &Run,
    arguments: &Map<String, Value>,
) -> Result<Map<String, Value>, ResolveError> {
    let mut resolved = Map::with_capacity(arguments.len());
    for (name, value) in arguments {
        let _ = resolved.insert(name.clone(), resolve_value(run, value)?);
    }
    Ok(resolved)
}

fn resolve_value(run: &Run, value: &Value) -> Result<Value, ResolveError> {
    match value {
        Value::String(text) => resolve_string(run, text),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(run, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                let _ = out.insert(key.clone(), resolve_value(run, inner)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(run: &Run, text: &str) -> Result<Value, ResolveError> {
    // Whole-value placeholder: substitute with the referenced value itself,
    // preserving its JSON type (an ID stays a number, a record an object).
    if let Some(captures) = PLACEHOLDER.captures(text) {
        if captures.get(0).map(|m| m.as_str()) == Some(text) {
            return lookup(run, &captures);
        }
    }

    if !PLACEHOLDER.is_match(text) {
        return Ok(Value::String(text.to_string()));
    }

    // Embedded placeholders render into the surrounding text.
    let mut rendered = String::with_capacity(text.len());
    let mut cursor = 0;
    for captures in PLACEHOLDER.captures_iter(text) {
        let whole = captures.get(0).expect("capture 0 always present");
        rendered.push_str(&text[cursor..whole.start()]);
        rendered.push_str(&render(&lookup(run, &captures)?));
        cursor = whole.end();
    }
    rendered.push_str(&text[cursor..]);
    Ok(Value::String(rendered))
}

/// Look up one captured placeholder in the run's step results.
fn lookup(run: &Run, captures: &regex::Captures<'_>) -> Result<Value, ResolveError> {
    let step: usize = captures[1]
        .parse()
        .map_err(|_| ResolveError::StepOutOfRange {
            step: 0,
            total: run.steps.len(),
        })?;
    if step == 0 || step > run.steps.len() {
        return Err(ResolveError::StepOutOfRange {
            step,
            total: run.steps.len(),
        });
    }

    let result = run.steps[step - 1]
        .result
        .as_ref()
        .ok_or(ResolveError::ResultNotRecorded { step })?;
    let path = captures[2].trim_start_matches('.');
    let mut current = result.data.clone().unwrap_or(Value::Null);

    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let next = match &current {
            Value::Object(map) => map.get(segment).cloned(),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index).cloned()),
            _ => None,
        };
        current = next.ok_or_else(|| ResolveError::MissingPath {
            step,
            path: path.to_string(),
        })?;
    }
    Ok(current)
}

/// Render a resolved value for embedding inside a string argument.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Resolves a step's arguments against the run ledger for its plan.
pub trait StepResolver: Send + Sync {
    /// Resolve placeholders in `arguments` against the plan's run.
    fn resolve(
        &self,
        plan_id: &PlanId,
        arguments: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ResolveError>;
}

/// [`StepResolver`] backed by a [`RunStore`].
pub struct RunLedgerResolver {
    store: std::sync::Arc<RunStore>,
}

impl RunLedgerResolver {
    /// Resolver reading prior-step results from the given store.
    #[must_use]
    pub fn new(store: std::sync::Arc<RunStore>) -> Self {
        Self { store }
    }
}

impl StepResolver for RunLedgerResolver {
    fn resolve(
        &self,
        plan_id: &PlanId,
        arguments: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ResolveError> {
        // Placeholder-free arguments pass through without a ledger lookup,
        // so single-step plans work before their run is tracked.
        if !contains_placeholders(arguments) {
            return Ok(arguments.clone());
        }
        let run = self
            .store
            .get_by_plan(plan_id)
            .ok_or_else(|| ResolveError::UnknownPlan {
                plan_id: plan_id.to_string(),
            })?;
        resolve_against_run(&run, arguments)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
