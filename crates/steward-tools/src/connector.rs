//! External connector capability and lookup traits.
//!
//! The connector performs the side-effecting call against the third-party
//! system; the lookups resolve which provider capability and which live
//! connection to use for a given user. All three are external collaborators
//! and are mocked in orchestrator tests.

use async_trait::async_trait;
use serde_json::{Map, Value};
use steward_core::UserId;

use crate::errors::ConnectorError;

/// Executes a named tool against a third-party provider.
#[async_trait]
pub trait ActionConnector: Send + Sync {
    /// Performs the call and returns the raw provider payload.
    ///
    /// The payload may itself be a failure envelope (`success: false`) or a
    /// truncation envelope (`truncated_response`); interpreting those is the
    /// caller's job. `Err` means the dispatch itself failed.
    async fn execute(
        &self,
        provider_key: &str,
        connection_id: &str,
        tool_name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, ConnectorError>;
}

/// Resolves which provider capability serves a tool for a user.
#[async_trait]
pub trait ProviderKeyLookup: Send + Sync {
    /// Provider key override for the user, `None` to use the tool's default.
    async fn provider_key(&self, user_id: &UserId, tool_name: &str) -> Option<String>;
}

/// Resolves a user's live connection for a provider.
#[async_trait]
pub trait ConnectionLookup: Send + Sync {
    /// Connection id, `None` when the user has not connected the provider.
    async fn connection_id(&self, user_id: &UserId, provider_key: &str) -> Option<String>;
}

/// Extracts the failure message from an explicit failure envelope.
///
/// Returns `Some` only for payloads shaped `{"success": false, ...}`.
#[must_use]
pub fn failure_message(raw: &Value) -> Option<String> {
    if raw.get("success")?.as_bool()? {
        return None;
    }
    Some(
        raw.get("message")
            .and_then(Value::as_str)
            .unwrap_or("connector reported failure")
            .to_string(),
    )
}

/// Extracts the raw text from a truncation envelope.
#[must_use]
pub fn truncated_payload(raw: &Value) -> Option<&str> {
    raw.get("truncated_response")?.as_str()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
