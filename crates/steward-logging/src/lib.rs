//! # steward-logging
//!
//! Structured logging with `tracing`:
//!
//! - [`LogLevel`] shared with settings
//! - [`init_logging`] building a `tracing-subscriber` with `EnvFilter`
//!   (`RUST_LOG` wins, settings level otherwise) and optional JSON output

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Log severity, ordered least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Detailed entry/exit points.
    Trace,
    /// Intermediate values, decisions.
    Debug,
    /// Outcomes, summaries.
    Info,
    /// Non-fatal issues.
    Warn,
    /// Errors.
    Error,
}

impl LogLevel {
    /// Stable string form, usable as an `EnvFilter` directive.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Convert from string (case-insensitive), defaulting to `Info`.
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscriber configuration.
#[derive(Debug, Clone, Copy)]
pub struct LogOptions {
    /// Level applied when `RUST_LOG` is unset.
    pub default_level: LogLevel,
    /// Emit JSON-formatted log lines.
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            json: false,
        }
    }
}

impl LogOptions {
    /// Options from a settings-style level string and JSON flag.
    #[must_use]
    pub fn new(level: &str, json: bool) -> Self {
        Self {
            default_level: LogLevel::from_str_lossy(level),
            json,
        }
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured default level. Calling
/// this more than once keeps the first subscriber; later calls are no-ops,
/// so tests may call it freely.
pub fn init_logging(options: &LogOptions) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if options.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };
    if installed {
        debug!(level = %options.default_level, json = options.json, "logging initialized");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn log_level_serde() {
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"warn\"");
        let back: LogLevel = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(back, LogLevel::Error);
    }

    #[test]
    fn log_level_display_matches_as_str() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            assert_eq!(level.to_string(), level.as_str());
        }
    }

    #[test]
    fn log_level_from_str_lossy() {
        assert_eq!(LogLevel::from_str_lossy("WARN"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str_lossy("warning"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str_lossy("unknown"), LogLevel::Info);
        assert_eq!(LogLevel::from_str_lossy("Trace"), LogLevel::Trace);
    }

    #[test]
    fn options_from_settings_strings() {
        let options = LogOptions::new("debug", true);
        assert_eq!(options.default_level, LogLevel::Debug);
        assert!(options.json);
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_logging(&LogOptions::default());
        init_logging(&LogOptions::new("debug", false));
    }

    #[test]
    fn emitting_after_init_does_not_panic() {
        init_logging(&LogOptions::default());
        tracing::info!(level = %LogLevel::Info, "subscriber active");
    }
}
