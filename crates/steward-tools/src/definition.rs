//! Tool definitions and parameter schemas.
//!
//! A [`ToolDefinition`] is immutable after construction: the registry hands
//! out references and every consumer treats it as read-only. Requirement
//! rules distinguish always-required parameters from conditionally-required
//! ones that an alternative parameter can satisfy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Free-form text.
    String,
    /// Integer or float.
    Number,
    /// True/false flag.
    Boolean,
    /// Nested JSON object.
    Object,
    /// JSON array.
    Array,
}

impl ParameterType {
    /// JSON Schema type name.
    #[must_use]
    pub const fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

/// When a parameter must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Always required.
    Required,
    /// Required unless the named alternative parameter is present.
    RequiredUnless {
        /// Parameter whose presence waives this one.
        unless: String,
    },
    /// Never required.
    Optional,
}

/// One parameter of a tool's input schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name as it appears in the arguments object.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub kind: ParameterType,
    /// Question shown to the user when collecting this parameter.
    pub prompt: String,
    /// Format hint, shown alongside the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Requirement rule.
    pub requirement: Requirement,
}

impl ParameterSpec {
    /// Always-required parameter.
    #[must_use]
    pub fn required(name: &str, kind: ParameterType, prompt: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            prompt: prompt.to_string(),
            hint: None,
            requirement: Requirement::Required,
        }
    }

    /// Parameter required unless `unless` is present.
    #[must_use]
    pub fn required_unless(name: &str, kind: ParameterType, prompt: &str, unless: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            prompt: prompt.to_string(),
            hint: None,
            requirement: Requirement::RequiredUnless {
                unless: unless.to_string(),
            },
        }
    }

    /// Optional parameter.
    #[must_use]
    pub fn optional(name: &str, kind: ParameterType, prompt: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            prompt: prompt.to_string(),
            hint: None,
            requirement: Requirement::Optional,
        }
    }

    /// Attaches a format hint.
    #[must_use]
    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }
}

/// Grouping used for catalog organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Outbound messaging.
    Email,
    /// Calendar and scheduling.
    Calendar,
    /// CRM record operations.
    Crm,
    /// Contact search.
    Contacts,
}

/// An immutable tool description: schema, prompts, and routing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name referenced by plans and tool calls.
    pub name: String,
    /// What the tool does, shown to the model.
    pub description: String,
    /// Catalog grouping.
    pub category: ToolCategory,
    /// Capability key the connector lookup resolves a connection for.
    pub provider_key: String,
    /// Ordered parameter list.
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDefinition {
    /// Definition with no parameters yet.
    #[must_use]
    pub fn new(name: &str, description: &str, category: ToolCategory, provider_key: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category,
            provider_key: provider_key.to_string(),
            parameters: Vec::new(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Looks up a parameter spec by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|spec| spec.name == name)
    }

    /// Names of parameters that must be present for the given arguments but
    /// are not, in declaration order.
    ///
    /// A parameter is missing when it is required and absent, or
    /// conditionally required with both itself and its alternative absent.
    /// Optional parameters never appear.
    #[must_use]
    pub fn missing_parameters(&self, arguments: &Map<String, Value>) -> Vec<String> {
        self.parameters
            .iter()
            .filter(|spec| {
                let present = argument_present(arguments, &spec.name);
                match &spec.requirement {
                    Requirement::Required => !present,
                    Requirement::RequiredUnless { unless } => {
                        !present && !argument_present(arguments, unless)
                    }
                    Requirement::Optional => false,
                }
            })
            .map(|spec| spec.name.clone())
            .collect()
    }

    /// JSON Schema describing the arguments object, advertised to the model.
    ///
    /// Only always-required parameters land in `required`; conditional ones
    /// carry the condition in their description instead.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for spec in &self.parameters {
            let mut description = spec.prompt.clone();
            if let Some(hint) = &spec.hint {
                description.push_str(" (");
                description.push_str(hint);
                description.push(')');
            }
            if let Requirement::RequiredUnless { unless } = &spec.requirement {
                description.push_str(&format!(" Required unless '{unless}' is provided."));
            }
            let _ = properties.insert(
                spec.name.clone(),
                serde_json::json!({
                    "type": spec.kind.json_type(),
                    "description": description,
                }),
            );
            if spec.requirement == Requirement::Required {
                required.push(Value::String(spec.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn argument_present(arguments: &Map<String, Value>, name: &str) -> bool {
    arguments.get(name).is_some_and(value_is_present)
}

/// Whether a value counts as "provided" for requirement checks.
///
/// Null, blank strings, and empty collections all count as absent; a cleared
/// text field behaves the same as a never-set one.
#[must_use]
pub fn value_is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
