//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`StewardSettings::default()`]
//! 2. If `~/.steward/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `STEWARD_*` environment overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use steward_logging::LogLevel;
use tracing::debug;

use crate::errors::Result;
use crate::types::StewardSettings;

/// Resolve the path to the settings file (`~/.steward/settings.json`).
#[must_use]
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".steward").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<StewardSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<StewardSettings> {
    let defaults = serde_json::to_value(StewardSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: StewardSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `STEWARD_*` environment overrides to loaded settings.
///
/// Each variable has strict parsing rules; invalid values are ignored with a
/// warning, falling back to the file/default value.
pub fn apply_env_overrides(settings: &mut StewardSettings) {
    // ── Models ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("STEWARD_MODEL") {
        settings.models.conversational.clone_from(&v);
        settings.models.tool_identification.clone_from(&v);
        settings.models.artifact.clone_from(&v);
        settings.models.planner = v;
    }
    if let Some(v) = read_env_string("STEWARD_PLANNER_MODEL") {
        settings.models.planner = v;
    }

    // ── Endpoint ────────────────────────────────────────────────────
    if let Some(v) = read_env_string("STEWARD_BASE_URL") {
        settings.endpoint.base_url = v;
    }
    if let Some(v) = read_env_string("STEWARD_API_KEY_ENV") {
        settings.endpoint.api_key_env = v;
    }
    if let Some(v) = read_env_u64("STEWARD_REQUEST_TIMEOUT_MS", 1000, 600_000) {
        settings.endpoint.request_timeout_ms = v;
    }

    // ── Narration / planner / sanitization ──────────────────────────
    if let Some(v) = read_env_usize("STEWARD_CHANNEL_CAPACITY", 1, 65_536) {
        settings.narration.channel_capacity = v;
    }
    if let Some(v) = read_env_usize("STEWARD_PLANNER_MAX_STEPS", 1, 100) {
        settings.planner.max_steps = v;
    }
    if let Some(v) = read_env_u32("STEWARD_PAGE_SIZE_CEILING", 1, 10_000) {
        settings.sanitize.page_size_ceiling = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_log_level("STEWARD_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("STEWARD_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
#[must_use]
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within a range.
#[must_use]
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
#[must_use]
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
#[must_use]
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a known log level (case-insensitive).
#[must_use]
pub fn parse_log_level(val: &str) -> Option<LogLevel> {
    match val.to_lowercase().as_str() {
        "trace" => Some(LogLevel::Trace),
        "debug" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" => Some(LogLevel::Warn),
        "error" => Some(LogLevel::Error),
        _ => None,
    }
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

fn read_env_log_level(name: &str) -> Option<LogLevel> {
    let val = std::env::var(name).ok()?;
    let result = parse_log_level(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid log level env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
