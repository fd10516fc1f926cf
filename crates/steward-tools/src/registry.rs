//! Tool registry: the read-only index of available tools.
//!
//! Built once at startup (usually from [`crate::catalog::builtin_tools`]),
//! then shared behind `Arc` for unsynchronized concurrent reads. The planner
//! validates plans against it and the orchestrator resolves schemas and
//! provider keys through it.

use std::collections::HashMap;

use tracing::debug;

use crate::definition::ToolDefinition;
use crate::errors::RegistryError;

/// Index of tool name to definition.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the builtin action catalog.
    #[must_use]
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        for definition in crate::catalog::builtin_tools() {
            registry.register(definition);
        }
        registry
    }

    /// Registers a definition. Overwrites any existing tool with the same name.
    pub fn register(&mut self, definition: ToolDefinition) {
        debug!(tool_name = %definition.name, "tool registered");
        let _ = self.tools.insert(definition.name.clone(), definition);
    }

    /// Looks up a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Looks up a definition, failing on unknown names.
    pub fn require(&self, name: &str) -> Result<&ToolDefinition, RegistryError> {
        self.tools.get(name).ok_or_else(|| RegistryError::UnknownTool {
            name: name.to_string(),
        })
    }

    /// Whether a tool with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All definitions, arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    /// All tool names, sorted alphabetically.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
