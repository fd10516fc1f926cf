//! Settings type definitions.
//!
//! Every field has a serde default so a partial settings file deserializes
//! cleanly; the loader deep-merges file values over these defaults.

use serde::{Deserialize, Serialize};
use steward_core::StreamRole;
use steward_logging::LogLevel;

/// Root settings object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StewardSettings {
    /// Settings schema version.
    pub version: u32,
    /// Per-role model selection.
    pub models: ModelSettings,
    /// Per-role system prompts.
    pub prompts: PromptSettings,
    /// Completion endpoint connection.
    pub endpoint: EndpointSettings,
    /// Narration channel sizing.
    pub narration: NarrationSettings,
    /// Planner limits.
    pub planner: PlannerSettings,
    /// Argument sanitization bounds.
    pub sanitize: SanitizeSettings,
    /// Log output configuration.
    pub logging: LoggingSettings,
}

impl Default for StewardSettings {
    fn default() -> Self {
        Self {
            version: 1,
            models: ModelSettings::default(),
            prompts: PromptSettings::default(),
            endpoint: EndpointSettings::default(),
            narration: NarrationSettings::default(),
            planner: PlannerSettings::default(),
            sanitize: SanitizeSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Which model serves each stream role and the planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    /// Narrative stream model.
    pub conversational: String,
    /// Tool-identification stream model.
    pub tool_identification: String,
    /// Artifact stream model.
    pub artifact: String,
    /// Structured-output planning model.
    pub planner: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            conversational: "gpt-4o".to_string(),
            tool_identification: "gpt-4o-mini".to_string(),
            artifact: "gpt-4o".to_string(),
            planner: "gpt-4o-mini".to_string(),
        }
    }
}

impl ModelSettings {
    /// Model serving the given stream role.
    #[must_use]
    pub fn for_role(&self, role: StreamRole) -> &str {
        match role {
            StreamRole::Conversational => &self.conversational,
            StreamRole::ToolIdentification => &self.tool_identification,
            StreamRole::Artifact => &self.artifact,
        }
    }
}

/// System prompt per stream role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptSettings {
    /// Narrative stream prompt.
    pub conversational: String,
    /// Tool-identification stream prompt.
    pub tool_identification: String,
    /// Artifact stream prompt.
    pub artifact: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            conversational: "You are a helpful assistant. Narrate what you are doing for the \
                             user in short, clear sentences."
                .to_string(),
            tool_identification: "Identify which of the available tools the user's request \
                                  requires and call them with the best arguments you can infer."
                .to_string(),
            artifact: "Produce the requested document or artifact content.".to_string(),
        }
    }
}

impl PromptSettings {
    /// Prompt for the given stream role.
    #[must_use]
    pub fn for_role(&self, role: StreamRole) -> &str {
        match role {
            StreamRole::Conversational => &self.conversational,
            StreamRole::ToolIdentification => &self.tool_identification,
            StreamRole::Artifact => &self.artifact,
        }
    }
}

/// Completion endpoint connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointSettings {
    /// Endpoint prefix, without the `/chat/completions` path.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout for non-streaming calls, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_ms: 60_000,
        }
    }
}

impl EndpointSettings {
    /// Reads the API key from the configured environment variable.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}

/// Narration channel sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NarrationSettings {
    /// Broadcast channel capacity; slow subscribers past this lag and drop.
    pub channel_capacity: usize,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Planner limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerSettings {
    /// Plans longer than this are rejected as malformed.
    pub max_steps: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self { max_steps: 10 }
    }
}

/// Bounds for argument sanitization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SanitizeSettings {
    /// Smallest accepted page size.
    pub page_size_floor: u32,
    /// Largest accepted page size.
    pub page_size_ceiling: u32,
}

impl Default for SanitizeSettings {
    fn default() -> Self {
        Self {
            page_size_floor: 1,
            page_size_ceiling: 200,
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is unset.
    pub level: LogLevel,
    /// Emit JSON-formatted log lines.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
