//! Tool-call fragment reconstruction.
//!
//! Providers stream a tool call as deltas keyed by choice index: the id
//! arrives once, while the name and argument JSON arrive as string pieces in
//! emission order. [`FragmentAccumulator`] merges deltas per index and turns
//! the completed slots into [`ToolCall`]s, parsing arguments fail-open so a
//! model that emits malformed JSON still produces a dispatchable call.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use steward_core::{SessionId, ToolCall, ToolCallId, UserId};
use tracing::{debug, warn};

/// Longest slice of raw arguments echoed into a log line.
const ARGUMENTS_PREVIEW_CHARS: usize = 100;

/// Parses a raw tool-call argument string into an object.
///
/// Missing, empty, malformed, and non-object payloads all collapse to an
/// empty map with a warning rather than failing the call. Models
/// occasionally emit truncated or schema-violating argument JSON; dispatch
/// with no arguments lets downstream validation report the real problem.
#[must_use]
pub fn parse_tool_call_arguments(
    raw: Option<&str>,
    tool_name: Option<&str>,
) -> Map<String, Value> {
    let Some(raw) = raw else {
        return Map::new();
    };
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(
                tool_name = tool_name.unwrap_or("<unknown>"),
                value_type = value_type_name(&other),
                "tool-call arguments are not a JSON object; using empty arguments"
            );
            Map::new()
        }
        Err(error) => {
            warn!(
                tool_name = tool_name.unwrap_or("<unknown>"),
                error = %error,
                arguments_preview = %clamp(raw),
                "tool-call arguments are not valid JSON; using empty arguments"
            );
            Map::new()
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn clamp(raw: &str) -> &str {
    let end = raw
        .char_indices()
        .nth(ARGUMENTS_PREVIEW_CHARS)
        .map_or(raw.len(), |(index, _)| index);
    &raw[..end]
}

/// One in-flight tool call being assembled from deltas.
#[derive(Debug, Default)]
struct FragmentSlot {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Merges streamed tool-call deltas into complete calls.
///
/// Slots are keyed by the provider's choice index. The id is taken from the
/// first delta that carries one and later ids are ignored; name and argument
/// fragments concatenate in arrival order.
#[derive(Debug, Default)]
pub struct FragmentAccumulator {
    slots: BTreeMap<u32, FragmentSlot>,
}

impl FragmentAccumulator {
    /// Empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one delta into the slot for `index`.
    pub fn absorb(
        &mut self,
        index: u32,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) {
        let slot = self.slots.entry(index).or_default();
        if slot.id.is_none() {
            if let Some(id) = id {
                slot.id = Some(id.to_string());
            }
        }
        if let Some(name) = name {
            slot.name.push_str(name);
        }
        if let Some(arguments) = arguments {
            slot.arguments.push_str(arguments);
        }
    }

    /// Whether no deltas have been absorbed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of distinct call slots seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Consumes the accumulator and produces calls in index order.
    ///
    /// Slots that never received a name are dropped; a call without a name
    /// cannot be dispatched. Slots without an id get a generated one.
    #[must_use]
    pub fn finish(self, session_id: &SessionId, user_id: &UserId) -> Vec<ToolCall> {
        let mut calls = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots {
            if slot.name.is_empty() {
                warn!(index, "dropping tool-call slot with no name");
                continue;
            }
            let arguments =
                parse_tool_call_arguments(Some(&slot.arguments), Some(&slot.name));
            calls.push(ToolCall {
                id: slot.id.map_or_else(ToolCallId::new, ToolCallId::from),
                name: slot.name,
                arguments,
                session_id: session_id.clone(),
                user_id: user_id.clone(),
            });
        }
        debug!(call_count = calls.len(), "tool-call fragments assembled");
        calls
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids() -> (SessionId, UserId) {
        (
            SessionId::from("session-1"),
            UserId::from("user-1"),
        )
    }

    // ── parse_tool_call_arguments ──

    #[test]
    fn parses_valid_object() {
        let map = parse_tool_call_arguments(Some("{\"to\":\"a@b.c\",\"n\":2}"), Some("send_email"));
        assert_eq!(map.get("to"), Some(&json!("a@b.c")));
        assert_eq!(map.get("n"), Some(&json!(2)));
    }

    #[test]
    fn none_and_empty_become_empty_map() {
        assert!(parse_tool_call_arguments(None, None).is_empty());
        assert!(parse_tool_call_arguments(Some(""), None).is_empty());
        assert!(parse_tool_call_arguments(Some("   "), None).is_empty());
    }

    #[test]
    fn malformed_json_becomes_empty_map() {
        assert!(parse_tool_call_arguments(Some("{\"to\":"), Some("send_email")).is_empty());
        assert!(parse_tool_call_arguments(Some("not json"), None).is_empty());
    }

    #[test]
    fn non_object_json_becomes_empty_map() {
        assert!(parse_tool_call_arguments(Some("[1,2,3]"), None).is_empty());
        assert!(parse_tool_call_arguments(Some("\"text\""), None).is_empty());
        assert!(parse_tool_call_arguments(Some("42"), None).is_empty());
        assert!(parse_tool_call_arguments(Some("null"), None).is_empty());
    }

    #[test]
    fn nested_objects_survive() {
        let map = parse_tool_call_arguments(
            Some("{\"filters\":{\"status\":\"open\"},\"tags\":[\"a\"]}"),
            Some("query_crm_records"),
        );
        assert_eq!(map.get("filters"), Some(&json!({"status": "open"})));
        assert_eq!(map.get("tags"), Some(&json!(["a"])));
    }

    // ── FragmentAccumulator ──

    #[test]
    fn assembles_single_call_from_fragments() {
        let (session_id, user_id) = ids();
        let mut accumulator = FragmentAccumulator::new();
        accumulator.absorb(0, Some("call_1"), Some("send_email"), None);
        accumulator.absorb(0, None, None, Some("{\"to\":"));
        accumulator.absorb(0, None, None, Some("\"a@b.c\"}"));

        let calls = accumulator.finish(&session_id, &user_id);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id.as_str(), "call_1");
        assert_eq!(calls[0].name, "send_email");
        assert_eq!(calls[0].arguments.get("to"), Some(&json!("a@b.c")));
        assert_eq!(calls[0].session_id, session_id);
    }

    #[test]
    fn id_is_taken_once() {
        let (session_id, user_id) = ids();
        let mut accumulator = FragmentAccumulator::new();
        accumulator.absorb(0, Some("first"), Some("t"), Some("{}"));
        accumulator.absorb(0, Some("second"), None, None);

        let calls = accumulator.finish(&session_id, &user_id);
        assert_eq!(calls[0].id.as_str(), "first");
    }

    #[test]
    fn name_fragments_concatenate() {
        let (session_id, user_id) = ids();
        let mut accumulator = FragmentAccumulator::new();
        accumulator.absorb(0, Some("c1"), Some("send_"), None);
        accumulator.absorb(0, None, Some("email"), Some("{}"));

        let calls = accumulator.finish(&session_id, &user_id);
        assert_eq!(calls[0].name, "send_email");
    }

    #[test]
    fn interleaved_indices_come_out_in_index_order() {
        let (session_id, user_id) = ids();
        let mut accumulator = FragmentAccumulator::new();
        accumulator.absorb(1, Some("c-b"), Some("second_tool"), Some("{\"b\":"));
        accumulator.absorb(0, Some("c-a"), Some("first_tool"), Some("{\"a\":1}"));
        accumulator.absorb(1, None, None, Some("2}"));

        let calls = accumulator.finish(&session_id, &user_id);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "first_tool");
        assert_eq!(calls[1].name, "second_tool");
        assert_eq!(calls[1].arguments.get("b"), Some(&json!(2)));
    }

    #[test]
    fn unnamed_slot_is_dropped() {
        let (session_id, user_id) = ids();
        let mut accumulator = FragmentAccumulator::new();
        accumulator.absorb(0, Some("c1"), None, Some("{\"x\":1}"));
        accumulator.absorb(1, Some("c2"), Some("real_tool"), Some("{}"));

        let calls = accumulator.finish(&session_id, &user_id);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "real_tool");
    }

    #[test]
    fn missing_id_gets_generated() {
        let (session_id, user_id) = ids();
        let mut accumulator = FragmentAccumulator::new();
        accumulator.absorb(0, None, Some("tool"), Some("{}"));

        let calls = accumulator.finish(&session_id, &user_id);
        assert!(!calls[0].id.as_str().is_empty());
    }

    #[test]
    fn malformed_arguments_still_produce_a_call() {
        let (session_id, user_id) = ids();
        let mut accumulator = FragmentAccumulator::new();
        accumulator.absorb(0, Some("c1"), Some("send_email"), Some("{\"to\": \"a@"));

        let calls = accumulator.finish(&session_id, &user_id);
        assert_eq!(calls.len(), 1);
        assert!(calls[0].arguments.is_empty());
    }

    #[test]
    fn empty_accumulator_finishes_empty() {
        let (session_id, user_id) = ids();
        let accumulator = FragmentAccumulator::new();
        assert!(accumulator.is_empty());
        assert!(accumulator.finish(&session_id, &user_id).is_empty());
    }

    #[test]
    fn len_counts_distinct_indices() {
        let mut accumulator = FragmentAccumulator::new();
        accumulator.absorb(0, None, Some("a"), None);
        accumulator.absorb(0, None, None, Some("{}"));
        accumulator.absorb(2, None, Some("b"), None);
        assert_eq!(accumulator.len(), 2);
    }

    // ── fragment splitting is transparent ──

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arguments_and_splits() -> impl Strategy<Value = (String, Vec<usize>)> {
            prop::collection::btree_map("[a-z]{1,6}", 0u32..1000, 1..5)
                .prop_map(|map| serde_json::to_string(&map).unwrap())
                .prop_flat_map(|json| {
                    let len = json.len();
                    (Just(json), prop::collection::vec(0..=len, 0..4))
                })
        }

        proptest! {
            /// Splitting the argument string at any byte positions yields the
            /// same call as absorbing it whole.
            #[test]
            fn split_points_do_not_change_the_result(
                (json, mut splits) in arguments_and_splits()
            ) {
                let (session_id, user_id) = ids();

                splits.sort_unstable();
                splits.dedup();
                let mut pieces = Vec::new();
                let mut start = 0;
                for split in splits {
                    pieces.push(&json[start..split]);
                    start = split;
                }
                pieces.push(&json[start..]);

                let mut fragmented = FragmentAccumulator::new();
                fragmented.absorb(0, Some("call"), Some("probe"), None);
                for piece in pieces {
                    fragmented.absorb(0, None, None, Some(piece));
                }

                let mut whole = FragmentAccumulator::new();
                whole.absorb(0, Some("call"), Some("probe"), Some(&json));

                let fragmented = fragmented.finish(&session_id, &user_id);
                let whole = whole.finish(&session_id, &user_id);
                prop_assert_eq!(&fragmented[0].arguments, &whole[0].arguments);
                prop_assert!(!fragmented[0].arguments.is_empty());
            }
        }
    }
}
