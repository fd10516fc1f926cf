//! Incremental SSE framing over a byte stream.
//!
//! Chat-completions endpoints stream `data:` lines separated by newlines,
//! with chunk boundaries falling anywhere, including mid-line. The parser
//! here buffers bytes, yields one payload string per complete `data:` line,
//! and filters the `[DONE]` sentinel and keep-alive comments.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// Initial capacity for the line buffer. Typical chunks are well under this.
const LINE_BUFFER_CAPACITY: usize = 8192;

/// Extracts the payload from one SSE line.
///
/// Returns `None` for comments, non-data fields, empty payloads, and the
/// `[DONE]` sentinel.
#[must_use]
pub fn extract_sse_data(line: &str) -> Option<String> {
    if line.starts_with(':') {
        return None;
    }
    let payload = line
        .strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))?;
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }
    Some(payload.to_string())
}

/// Decodes one SSE payload into `T`, skipping payloads that do not parse.
///
/// Providers interleave heartbeat and annotation payloads with data chunks;
/// dropping an undecodable payload keeps the stream alive.
#[must_use]
pub fn decode_sse_data<T: DeserializeOwned>(data: &str) -> Option<T> {
    match serde_json::from_str::<T>(data) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(
                error = %error,
                payload_preview = %preview(data),
                "skipping undecodable SSE payload"
            );
            None
        }
    }
}

/// Converts a byte stream into a stream of SSE data payloads.
///
/// Transport errors are yielded once and end the stream. Bytes left in the
/// buffer when the connection closes are discarded; a well-formed stream
/// terminates its final line before closing.
pub fn parse_sse_lines<S, E>(byte_stream: S) -> impl Stream<Item = ProviderResult<String>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<ProviderError>,
{
    let state = (
        byte_stream,
        BytesMut::with_capacity(LINE_BUFFER_CAPACITY),
        false,
    );
    futures::stream::unfold(state, |(mut stream, mut buffer, done)| async move {
        if done {
            return None;
        }
        loop {
            // Drain complete lines before pulling more bytes.
            while let Some(line) = drain_line(&mut buffer) {
                if let Some(data) = extract_sse_data(&line) {
                    return Some((Ok(data), (stream, buffer, false)));
                }
            }
            match stream.next().await {
                Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                Some(Err(error)) => {
                    return Some((Err(error.into()), (stream, buffer, true)));
                }
                None => {
                    if !buffer.is_empty() {
                        debug!(
                            discarded_bytes = buffer.len(),
                            "SSE stream closed mid-line"
                        );
                    }
                    return None;
                }
            }
        }
    })
}

/// Splits the next complete line off the front of `buffer`.
fn drain_line(buffer: &mut BytesMut) -> Option<String> {
    let newline = buffer.iter().position(|&b| b == b'\n')?;
    let line = buffer.split_to(newline + 1);
    let mut text = String::from_utf8_lossy(&line).into_owned();
    while text.ends_with('\n') || text.ends_with('\r') {
        let _ = text.pop();
    }
    Some(text)
}

/// Clamps a payload for log output.
fn preview(data: &str) -> &str {
    let end = data
        .char_indices()
        .nth(100)
        .map_or(data.len(), |(index, _)| index);
    &data[..end]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn byte_stream(
        chunks: Vec<&str>,
    ) -> impl Stream<Item = Result<Bytes, ProviderError>> + Unpin {
        futures::stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok(Bytes::from(chunk.to_string())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect_payloads(
        chunks: Vec<&str>,
    ) -> Vec<ProviderResult<String>> {
        parse_sse_lines(byte_stream(chunks)).collect().await
    }

    fn unwrap_all(results: Vec<ProviderResult<String>>) -> Vec<String> {
        results.into_iter().map(Result::unwrap).collect()
    }

    // ── extract_sse_data ──

    #[test]
    fn extracts_payload_with_space() {
        assert_eq!(
            extract_sse_data("data: {\"x\":1}"),
            Some("{\"x\":1}".to_string())
        );
    }

    #[test]
    fn extracts_payload_without_space() {
        assert_eq!(
            extract_sse_data("data:{\"x\":1}"),
            Some("{\"x\":1}".to_string())
        );
    }

    #[test]
    fn filters_done_sentinel() {
        assert_eq!(extract_sse_data("data: [DONE]"), None);
    }

    #[test]
    fn filters_comments_and_non_data_fields() {
        assert_eq!(extract_sse_data(": keep-alive"), None);
        assert_eq!(extract_sse_data("event: ping"), None);
        assert_eq!(extract_sse_data(""), None);
    }

    #[test]
    fn filters_empty_payload() {
        assert_eq!(extract_sse_data("data: "), None);
        assert_eq!(extract_sse_data("data:"), None);
    }

    // ── parse_sse_lines ──

    #[tokio::test]
    async fn parses_single_event() {
        let payloads = unwrap_all(collect_payloads(vec!["data: {\"a\":1}\n\n"]).await);
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[tokio::test]
    async fn parses_multiple_events_in_one_chunk() {
        let payloads =
            unwrap_all(collect_payloads(vec!["data: first\n\ndata: second\n\n"]).await);
        assert_eq!(payloads, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn reassembles_event_split_across_chunks() {
        let payloads = unwrap_all(
            collect_payloads(vec!["data: {\"delta\":", "\"hel", "lo\"}\n\n"]).await,
        );
        assert_eq!(payloads, vec!["{\"delta\":\"hello\"}"]);
    }

    #[tokio::test]
    async fn strips_carriage_returns() {
        let payloads = unwrap_all(collect_payloads(vec!["data: one\r\ndata: two\r\n"]).await);
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn skips_done_and_comments_mid_stream() {
        let payloads = unwrap_all(
            collect_payloads(vec![": ping\ndata: real\n\ndata: [DONE]\n\n"]).await,
        );
        assert_eq!(payloads, vec!["real"]);
    }

    #[tokio::test]
    async fn discards_trailing_partial_line() {
        let payloads = unwrap_all(collect_payloads(vec!["data: whole\ndata: torn"]).await);
        assert_eq!(payloads, vec!["whole"]);
    }

    #[tokio::test]
    async fn empty_stream_yields_nothing() {
        let payloads = collect_payloads(vec![]).await;
        assert!(payloads.is_empty());
    }

    #[tokio::test]
    async fn transport_error_is_yielded_then_stream_ends() {
        let chunks: Vec<Result<Bytes, ProviderError>> = vec![
            Ok(Bytes::from_static(b"data: before\n")),
            Err(ProviderError::SseParse {
                message: "connection reset".to_string(),
            }),
            Ok(Bytes::from_static(b"data: after\n")),
        ];
        let results: Vec<_> = parse_sse_lines(futures::stream::iter(chunks))
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_deref().unwrap(), "before");
        assert!(results[1].is_err());
    }

    // ── decode_sse_data ──

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        value: u32,
    }

    #[test]
    fn decodes_valid_payload() {
        let probe: Option<Probe> = decode_sse_data("{\"value\":7}");
        assert_eq!(probe, Some(Probe { value: 7 }));
    }

    #[test]
    fn undecodable_payload_becomes_none() {
        let probe: Option<Probe> = decode_sse_data("{\"value\":\"not a number\"}");
        assert_eq!(probe, None);

        let probe: Option<Probe> = decode_sse_data("not json at all");
        assert_eq!(probe, None);
    }
}
