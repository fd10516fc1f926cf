//! HTTP client for chat-completions endpoints.

use std::time::Duration;

use futures::{stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use serde_json::Value;
use steward_core::StreamEvent;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{
    CompletionProvider, CompletionRequest, ResponseFormat, StreamEventStream,
};
use crate::sse::{decode_sse_data, parse_sse_lines};

use super::stream::chunk_events;
use super::types::{wire_request, ChatChunk, ChatCompletionsRequest, ChatResponse};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Default endpoint prefix for OpenAI-compatible servers.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Path appended to the base URL for both call styles.
const COMPLETIONS_PATH: &str = "/chat/completions";

/// Overall timeout for non-streaming structured calls. Streaming calls run
/// without one; the stream ends when the connection closes.
const STRUCTURED_CALL_TIMEOUT: Duration = Duration::from_secs(60);

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Connection settings for a chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatProviderConfig {
    /// Endpoint prefix, without the `/chat/completions` path.
    pub base_url: String,
    /// Bearer token, omitted for unauthenticated local endpoints.
    pub api_key: Option<String>,
}

impl Default for ChatProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// [`CompletionProvider`] over the chat-completions wire protocol.
#[derive(Debug)]
pub struct ChatCompletionsProvider {
    config: ChatProviderConfig,
    client: reqwest::Client,
}

impl ChatCompletionsProvider {
    /// Provider with its own connection pool.
    #[must_use]
    pub fn new(config: ChatProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn build_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
                ProviderError::Auth {
                    message: "API key contains characters invalid in a header".to_string(),
                }
            })?;
            let _ = headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Posts a request body and checks the status, leaving the body unread
    /// on success so the caller can stream or decode it.
    async fn post_completions(
        &self,
        body: &ChatCompletionsRequest,
        timeout: Option<Duration>,
    ) -> ProviderResult<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url, COMPLETIONS_PATH);
        let mut request = self.client.post(&url).headers(self.build_headers()?).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(ProviderError::Http)?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_ms(response.headers());
            let body_text = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), retry_after, &body_text));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        "chat_completions"
    }

    async fn stream(&self, request: &CompletionRequest) -> ProviderResult<StreamEventStream> {
        debug!(
            model = %request.model,
            message_count = request.messages.len(),
            tool_count = request.tools.len(),
            "starting chat-completions stream"
        );

        let response = self
            .post_completions(&wire_request(request, true), None)
            .await?;

        let events = parse_sse_lines(response.bytes_stream())
            .map(|line| match line {
                Ok(data) => decode_sse_data::<ChatChunk>(&data).map_or_else(Vec::new, |chunk| {
                    chunk_events(&chunk).into_iter().map(Ok).collect()
                }),
                Err(error) => vec![Err(error)],
            })
            .flat_map(stream::iter);

        let start_event = stream::once(async { Ok(StreamEvent::Start) });
        Ok(Box::pin(start_event.chain(events)))
    }

    async fn complete_json(&self, request: &CompletionRequest) -> ProviderResult<Value> {
        let mut request = request.clone();
        if request.response_format.is_none() {
            request.response_format = Some(ResponseFormat::JsonObject);
        }
        debug!(model = %request.model, "issuing structured completion");

        let response = self
            .post_completions(&wire_request(&request, false), Some(STRUCTURED_CALL_TIMEOUT))
            .await?;
        let body: ChatResponse = response.json().await.map_err(ProviderError::Http)?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse {
                message: "response carried no choices or no content".to_string(),
            })?;

        serde_json::from_str::<Value>(&content).map_err(|error| {
            ProviderError::MalformedResponse {
                message: format!("content is not valid JSON: {error}"),
            }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

/// Decodes an error response body.
fn parse_api_error(body: &str, status: u16) -> (String, Option<String>, bool) {
    let retryable = status == 429 || status >= 500;
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let error = &json["error"];
        let message = error["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        let code = error["type"].as_str().map(String::from);
        (message, code, retryable)
    } else {
        (format!("HTTP {status}: {body}"), None, retryable)
    }
}

fn status_error(status: u16, retry_after: Option<u64>, body: &str) -> ProviderError {
    let (message, code, retryable) = parse_api_error(body, status);
    match status {
        401 | 403 => ProviderError::Auth { message },
        429 => ProviderError::RateLimited {
            retry_after_ms: retry_after,
            message,
        },
        _ => ProviderError::Api {
            status,
            message,
            code,
            retryable,
        },
    }
}

fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|seconds| seconds.saturating_mul(1000))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
