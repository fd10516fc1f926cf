//! # steward-tools
//!
//! The tool layer consumed by the planner and orchestrator:
//!
//! - [`ToolDefinition`] with typed parameter specs and conditional requirements
//! - Read-only [`ToolRegistry`] plus the builtin action catalog
//! - Argument sanitization applied before dispatch
//! - External-collaborator traits: [`ActionConnector`], [`ProviderKeyLookup`],
//!   [`ConnectionLookup`]

#![deny(unsafe_code)]

pub mod catalog;
pub mod connector;
pub mod definition;
pub mod errors;
pub mod registry;
pub mod sanitize;

pub use catalog::builtin_tools;
pub use connector::{
    failure_message, truncated_payload, ActionConnector, ConnectionLookup, ProviderKeyLookup,
};
pub use definition::{
    value_is_present, ParameterSpec, ParameterType, Requirement, ToolCategory, ToolDefinition,
};
pub use errors::{ConnectorError, RegistryError};
pub use registry::ToolRegistry;
pub use sanitize::{sanitize_arguments, SanitizeOptions};
