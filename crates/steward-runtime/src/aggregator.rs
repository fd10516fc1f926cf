//! Stream aggregator — concurrent completion streams joined at a barrier.
//!
//! One user turn fans out several model-completion streams (conversational,
//! tool identification, optionally artifact). Each stream gets its own
//! consumer task that forwards narration chunks in arrival order, feeds the
//! markdown segmenter, and merges tool-call fragments by index. The turn's
//! result becomes available only once every contributing stream finishes —
//! a join, not a race — and a single stream failure flushes that stream's
//! partial narration and lets the barrier proceed without it.

use std::sync::Arc;

use futures::StreamExt;
use steward_core::{
    message_event, stream_end_event, stream_error_event, FinishReason, MessageId, NarrationBase,
    NarrationEvent, SessionId, StreamEvent, StreamRole, ToolCall, UserId,
};
use steward_llm::{FragmentAccumulator, StreamEventStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::emitter::NarrationEmitter;
use crate::segment::MarkdownSegmenter;

/// One completion stream contributing to a turn.
pub struct StreamInput {
    /// Role determining the `streamType` on every event the stream produces.
    pub role: StreamRole,
    /// The open provider stream.
    pub stream: StreamEventStream,
}

/// What one stream produced by the time it finished.
#[derive(Debug)]
pub struct StreamOutcome {
    /// The stream's role.
    pub role: StreamRole,
    /// Full narration text accumulated on this stream.
    pub narration: String,
    /// Terminal reason, `None` when the channel closed without one or the
    /// stream errored.
    pub finish_reason: Option<FinishReason>,
    /// Error message when the stream failed mid-flight.
    pub error: Option<String>,
    /// Fully-reconstructed tool calls from this stream.
    pub tool_calls: Vec<ToolCall>,
    /// Whether cancellation was observed before the stream finished.
    pub cancelled: bool,
}

/// Result of one aggregated turn, available after the fan-in barrier.
#[derive(Debug)]
pub struct AggregatedTurn {
    /// Message the narration chunks were attributed to.
    pub message_id: MessageId,
    /// Merged tool calls from all streams, in stream input order.
    pub tool_calls: Vec<ToolCall>,
    /// Per-stream outcomes, in stream input order.
    pub streams: Vec<StreamOutcome>,
    /// Whether the client disconnected mid-turn.
    pub cancelled: bool,
}

impl AggregatedTurn {
    /// Narration text for the given role, if that stream contributed.
    #[must_use]
    pub fn narration(&self, role: StreamRole) -> Option<&str> {
        self.streams
            .iter()
            .find(|outcome| outcome.role == role)
            .map(|outcome| outcome.narration.as_str())
    }

    /// Roles and messages of the streams that failed.
    #[must_use]
    pub fn errors(&self) -> Vec<(StreamRole, &str)> {
        self.streams
            .iter()
            .filter_map(|outcome| {
                outcome
                    .error
                    .as_deref()
                    .map(|message| (outcome.role, message))
            })
            .collect()
    }
}

/// Runs a turn's completion streams concurrently and merges their output.
pub struct StreamAggregator {
    emitter: Arc<NarrationEmitter>,
}

impl StreamAggregator {
    /// Aggregator emitting through the given narration channel.
    #[must_use]
    pub fn new(emitter: Arc<NarrationEmitter>) -> Self {
        Self { emitter }
    }

    /// Consume every stream to completion and merge the results.
    ///
    /// Narration chunks are forwarded to subscribers as they arrive, in
    /// arrival order per stream; no cross-stream ordering is imposed. The
    /// returned value is ready only after all streams are done.
    #[instrument(skip_all, fields(session_id = %session_id, message_id = %message_id, stream_count = streams.len()))]
    pub async fn run_turn(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        message_id: &MessageId,
        streams: Vec<StreamInput>,
        cancel: &CancellationToken,
    ) -> AggregatedTurn {
        let mut tasks: JoinSet<(usize, StreamOutcome)> = JoinSet::new();
        for (position, input) in streams.into_iter().enumerate() {
            let emitter = Arc::clone(&self.emitter);
            let session_id = session_id.clone();
            let user_id = user_id.clone();
            let message_id = message_id.clone();
            let cancel = cancel.clone();
            let _abort = tasks.spawn(async move {
                let outcome = consume_stream(
                    input.role,
                    input.stream,
                    &session_id,
                    &user_id,
                    &message_id,
                    &emitter,
                    &cancel,
                )
                .await;
                (position, outcome)
            });
        }

        // Fan-in barrier: every consumer must finish before the turn result
        // exists. A panicked consumer is treated as an errored stream.
        let mut outcomes: Vec<(usize, StreamOutcome)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => outcomes.push(entry),
                Err(join_error) => {
                    warn!(error = %join_error, "stream consumer task failed");
                }
            }
        }
        outcomes.sort_by_key(|(position, _)| *position);

        let streams: Vec<StreamOutcome> =
            outcomes.into_iter().map(|(_, outcome)| outcome).collect();
        let cancelled = streams.iter().any(|outcome| outcome.cancelled);
        let tool_calls = streams
            .iter()
            .flat_map(|outcome| outcome.tool_calls.iter().cloned())
            .collect();

        debug!(
            streams = streams.len(),
            errors = streams.iter().filter(|o| o.error.is_some()).count(),
            cancelled,
            "turn streams joined"
        );

        AggregatedTurn {
            message_id: message_id.clone(),
            tool_calls,
            streams,
            cancelled,
        }
    }
}

/// Drive one stream to completion, forwarding narration as it arrives.
#[allow(clippy::too_many_lines)]
async fn consume_stream(
    role: StreamRole,
    mut stream: StreamEventStream,
    session_id: &SessionId,
    user_id: &UserId,
    message_id: &MessageId,
    emitter: &NarrationEmitter,
    cancel: &CancellationToken,
) -> StreamOutcome {
    let mut narration = String::with_capacity(1024);
    let mut fragments = FragmentAccumulator::new();
    let mut segmenter = MarkdownSegmenter::new();
    let mut finish_reason = None;
    let mut error = None;
    let mut cancelled = false;

    loop {
        // Cancellation is checked at every chunk boundary; prefer it when
        // both a chunk and the cancel signal are ready.
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(role = %role, "client disconnected; stopping stream");
                cancelled = true;
                break;
            }
            event = stream.next() => event,
        };

        match event {
            // Channel closed without a Done event still counts as done.
            None => break,
            Some(Err(provider_error)) => {
                warn!(role = %role, error = %provider_error, "stream errored");
                error = Some(provider_error.to_string());
                break;
            }
            Some(Ok(StreamEvent::Start)) => {}
            Some(Ok(StreamEvent::TextDelta { delta })) => {
                narration.push_str(&delta);
                let _ = emitter.emit(message_event(message_id, role, delta.clone()));
                for segment in segmenter.feed(&delta) {
                    let _ = emitter.emit(NarrationEvent::Segment {
                        base: NarrationBase::chunk(message_id, Some(role)),
                        content: segment,
                    });
                }
            }
            Some(Ok(StreamEvent::ToolCallDelta {
                index,
                id,
                name,
                arguments,
            })) => {
                fragments.absorb(index, id.as_deref(), name.as_deref(), arguments.as_deref());
            }
            Some(Ok(StreamEvent::Done {
                finish_reason: reason,
            })) => {
                finish_reason = Some(reason);
                break;
            }
        }
    }

    // The segmenter is stopped on every exit path; consuming it makes a
    // second stop impossible. After cancellation no further chunks may be
    // emitted, so the tail segments are discarded there.
    let tail = segmenter.finish();
    if !cancelled {
        for segment in tail {
            let _ = emitter.emit(NarrationEvent::Segment {
                base: NarrationBase::chunk(message_id, Some(role)),
                content: segment,
            });
        }
        if let Some(ref message) = error {
            let _ = emitter.emit(stream_error_event(message_id, role, message.clone()));
        } else {
            let _ = emitter.emit(stream_end_event(message_id, role, narration.clone()));
        }
    }

    // An errored stream's fragments may be half-assembled; the barrier
    // proceeds without its contribution.
    let tool_calls = if error.is_some() || cancelled {
        if !fragments.is_empty() {
            debug!(
                role = %role,
                slots = fragments.len(),
                "discarding tool-call fragments from unfinished stream"
            );
        }
        Vec::new()
    } else {
        fragments.finish(session_id, user_id)
    };

    StreamOutcome {
        role,
        narration,
        finish_reason,
        error,
        tool_calls,
        cancelled,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
