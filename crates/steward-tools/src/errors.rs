//! Tool-layer error types.

use thiserror::Error;

/// Errors raised by registry lookups.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The named tool is not in the registry.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// The tool name that was not found.
        name: String,
    },
}

/// Errors raised while dispatching a call to the external connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// No provider capability key could be resolved for the tool.
    #[error("no provider capability for tool '{tool_name}'")]
    MissingProviderKey {
        /// Tool whose provider could not be resolved.
        tool_name: String,
    },

    /// The user has no live connection for the provider.
    #[error("no active connection for provider '{provider_key}'")]
    MissingConnection {
        /// Provider capability key lacking a connection.
        provider_key: String,
    },

    /// The connector itself failed.
    #[error("dispatch failed: {message}")]
    Dispatch {
        /// Description of the dispatch failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_display_includes_name() {
        let err = RegistryError::UnknownTool {
            name: "send_fax".into(),
        };
        assert_eq!(err.to_string(), "unknown tool: send_fax");
    }

    #[test]
    fn connector_display_strings() {
        let err = ConnectorError::MissingProviderKey {
            tool_name: "send_email".into(),
        };
        assert_eq!(
            err.to_string(),
            "no provider capability for tool 'send_email'"
        );

        let err = ConnectorError::MissingConnection {
            provider_key: "gmail".into(),
        };
        assert_eq!(err.to_string(), "no active connection for provider 'gmail'");

        let err = ConnectorError::Dispatch {
            message: "socket closed".into(),
        };
        assert_eq!(err.to_string(), "dispatch failed: socket closed");
    }
}
