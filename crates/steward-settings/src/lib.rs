//! # steward-settings
//!
//! Configuration for the steward runtime:
//!
//! - [`StewardSettings`] with serde defaults for every field
//! - Loader: compiled defaults, deep-merged JSON file, `STEWARD_*` env
//!   overrides with validated parses
//!
//! The file lives at `~/.steward/settings.json` by default; a missing file
//! yields pure defaults.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use steward_logging::LogLevel;
pub use loader::{apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{
    EndpointSettings, LoggingSettings, ModelSettings, NarrationSettings, PlannerSettings,
    PromptSettings, SanitizeSettings, StewardSettings,
};
