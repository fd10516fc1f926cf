//! Argument sanitization applied before connector dispatch.
//!
//! The rules repair rather than reject: out-of-bounds paging values are
//! clamped, malformed date bounds are dropped one at a time, and vacuous
//! values (null, `{}`, `[]`) are pruned so the connector never receives
//! empty filter blocks.

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Argument keys treated as page-size values.
const PAGE_SIZE_KEYS: [&str; 2] = ["page_size", "limit"];

/// Argument keys treated as date-range bounds.
const DATE_KEYS: [&str; 2] = ["start_date", "end_date"];

/// Bounds for page-size clamping, normally sourced from settings.
#[derive(Debug, Clone, Copy)]
pub struct SanitizeOptions {
    /// Smallest accepted page size.
    pub page_size_floor: u32,
    /// Largest accepted page size.
    pub page_size_ceiling: u32,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            page_size_floor: 1,
            page_size_ceiling: 200,
        }
    }
}

/// Sanitizes one argument object.
#[must_use]
pub fn sanitize_arguments(
    arguments: Map<String, Value>,
    options: &SanitizeOptions,
) -> Map<String, Value> {
    let mut sanitized = Map::new();
    for (key, value) in arguments {
        if is_vacuous(&value) {
            debug!(parameter = %key, "pruning empty argument");
            continue;
        }
        if PAGE_SIZE_KEYS.contains(&key.as_str()) {
            match clamp_page_size(&value, options) {
                Some(clamped) => {
                    let _ = sanitized.insert(key, Value::from(clamped));
                }
                None => warn!(parameter = %key, "dropping non-numeric page-size argument"),
            }
            continue;
        }
        if DATE_KEYS.contains(&key.as_str()) {
            if value.as_str().is_some_and(is_valid_date) {
                let _ = sanitized.insert(key, value);
            } else {
                warn!(parameter = %key, "dropping malformed date bound");
            }
            continue;
        }
        let _ = sanitized.insert(key, value);
    }
    sanitized
}

fn is_vacuous(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_page_size(value: &Value, options: &SanitizeOptions) -> Option<u64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    let clamped = number.clamp(
        f64::from(options.page_size_floor),
        f64::from(options.page_size_ceiling),
    );
    Some(clamped as u64)
}

fn is_valid_date(text: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(text).is_ok()
        || chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sanitize(value: Value) -> Map<String, Value> {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        sanitize_arguments(map, &SanitizeOptions::default())
    }

    // ── page-size clamping ──

    #[test]
    fn in_range_page_size_unchanged() {
        let out = sanitize(json!({"page_size": 50}));
        assert_eq!(out.get("page_size"), Some(&json!(50)));
    }

    #[test]
    fn page_size_floored_at_minimum() {
        let out = sanitize(json!({"page_size": 0}));
        assert_eq!(out.get("page_size"), Some(&json!(1)));

        let out = sanitize(json!({"page_size": -5}));
        assert_eq!(out.get("page_size"), Some(&json!(1)));
    }

    #[test]
    fn page_size_capped_at_ceiling() {
        let out = sanitize(json!({"page_size": 10_000}));
        assert_eq!(out.get("page_size"), Some(&json!(200)));
    }

    #[test]
    fn limit_key_clamps_too() {
        let out = sanitize(json!({"limit": 9999}));
        assert_eq!(out.get("limit"), Some(&json!(200)));
    }

    #[test]
    fn numeric_string_page_size_parses_and_clamps() {
        let out = sanitize(json!({"page_size": "75"}));
        assert_eq!(out.get("page_size"), Some(&json!(75)));

        let out = sanitize(json!({"page_size": "500"}));
        assert_eq!(out.get("page_size"), Some(&json!(200)));
    }

    #[test]
    fn fractional_page_size_truncates() {
        let out = sanitize(json!({"page_size": 50.7}));
        assert_eq!(out.get("page_size"), Some(&json!(50)));
    }

    #[test]
    fn non_numeric_page_size_dropped() {
        let out = sanitize(json!({"page_size": "lots"}));
        assert!(!out.contains_key("page_size"));

        let out = sanitize(json!({"page_size": "NaN"}));
        assert!(!out.contains_key("page_size"));
    }

    #[test]
    fn custom_bounds_apply() {
        let options = SanitizeOptions {
            page_size_floor: 10,
            page_size_ceiling: 25,
        };
        let Value::Object(map) = json!({"page_size": 3}) else {
            panic!("expected object");
        };
        let out = sanitize_arguments(map, &options);
        assert_eq!(out.get("page_size"), Some(&json!(10)));
    }

    #[test]
    fn other_numeric_keys_are_not_clamped() {
        let out = sanitize(json!({"retries": 10_000}));
        assert_eq!(out.get("retries"), Some(&json!(10_000)));
    }

    // ── date bounds ──

    #[test]
    fn valid_dates_kept() {
        let out = sanitize(json!({
            "start_date": "2026-01-01",
            "end_date": "2026-03-31T23:59:59Z",
        }));
        assert_eq!(out.get("start_date"), Some(&json!("2026-01-01")));
        assert_eq!(out.get("end_date"), Some(&json!("2026-03-31T23:59:59Z")));
    }

    #[test]
    fn malformed_bound_dropped_individually() {
        let out = sanitize(json!({
            "start_date": "last tuesday",
            "end_date": "2026-03-31",
        }));
        assert!(!out.contains_key("start_date"));
        assert_eq!(out.get("end_date"), Some(&json!("2026-03-31")));
    }

    #[test]
    fn non_string_date_dropped() {
        let out = sanitize(json!({"start_date": 20260101}));
        assert!(!out.contains_key("start_date"));
    }

    // ── pruning ──

    #[test]
    fn vacuous_values_pruned() {
        let out = sanitize(json!({
            "filters": {},
            "tags": [],
            "note": null,
            "object_type": "Lead",
        }));
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("object_type"), Some(&json!("Lead")));
    }

    #[test]
    fn populated_filters_kept() {
        let out = sanitize(json!({"filters": {"status": "open"}}));
        assert_eq!(out.get("filters"), Some(&json!({"status": "open"})));
    }

    #[test]
    fn unrelated_keys_pass_through() {
        let out = sanitize(json!({
            "object_type": "Contact",
            "fields": {"phone": "555"},
            "flag": false,
        }));
        assert_eq!(out.len(), 3);
        assert_eq!(out.get("flag"), Some(&json!(false)));
    }
}
