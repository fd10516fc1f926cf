//! Provider error types.
//!
//! Every fallible surface in this crate returns [`ProviderError`] so callers
//! can branch on retryability without string matching.

use thiserror::Error;

/// Convenience alias used across the provider surface.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors produced while talking to a completion endpoint.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connection, timeout, TLS).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded as JSON.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// The SSE stream produced a line that could not be framed.
    #[error("SSE parse error: {message}")]
    SseParse {
        /// Human-readable description of the framing failure.
        message: String,
    },

    /// Credentials were missing or rejected.
    #[error("authentication failed: {message}")]
    Auth {
        /// Detail from the endpoint, if any.
        message: String,
    },

    /// The endpoint asked us to slow down.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Suggested backoff from the `Retry-After` header, when present.
        retry_after_ms: Option<u64>,
        /// Detail from the endpoint.
        message: String,
    },

    /// Non-success HTTP status with a decoded error payload.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
        /// Provider-specific error code, when present.
        code: Option<String>,
        /// Whether the request is worth retrying.
        retryable: bool,
    },

    /// The endpoint answered 2xx but the payload was not usable.
    #[error("malformed response: {message}")]
    MalformedResponse {
        /// What was missing or unparseable.
        message: String,
    },

    /// The request was cancelled before completion.
    #[error("request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect(),
            Self::RateLimited { .. } => true,
            Self::Api { retryable, .. } => *retryable,
            Self::Json(_)
            | Self::SseParse { .. }
            | Self::Auth { .. }
            | Self::MalformedResponse { .. }
            | Self::Cancelled => false,
        }
    }

    /// Suggested backoff in milliseconds, when the endpoint provided one.
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// Stable category label for logs and metrics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::SseParse { .. } => "sse_parse",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limited",
            Self::Api { .. } => "api",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Cancelled => "cancelled",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
