//! Narration emitter — broadcast channel to transport subscribers.
//!
//! Decouples narration delivery from any single transport: the runtime emits
//! typed [`NarrationEvent`]s and any number of subscribers (WebSocket
//! handlers, tests) receive them. Emission never blocks; a subscriber that
//! falls more than the channel capacity behind lags and loses the oldest
//! events, which is acceptable for narration (the terminal `stream_end`
//! event carries the full accumulated text).

use std::sync::atomic::{AtomicU64, Ordering};

use steward_core::NarrationEvent;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, trace};

/// Default channel capacity when settings do not provide one.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Typed broadcast channel for narration events.
pub struct NarrationEmitter {
    sender: broadcast::Sender<NarrationEvent>,
    emitted: AtomicU64,
}

impl NarrationEmitter {
    /// Emitter with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            emitted: AtomicU64::new(0),
        }
    }

    /// Subscribe to all events emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NarrationEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a `Stream`, for transports that consume streams.
    #[must_use]
    pub fn subscribe_stream(&self) -> BroadcastStream<NarrationEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Emit one event to every current subscriber.
    ///
    /// Returns the number of subscribers the event reached. Zero subscribers
    /// is not an error — narration simply has no audience yet.
    pub fn emit(&self, event: NarrationEvent) -> usize {
        let _ = self.emitted.fetch_add(1, Ordering::Relaxed);
        trace!(event_type = event.event_type(), "narration event emitted");
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("narration event dropped: no subscribers");
                0
            }
        }
    }

    /// Number of currently attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total events emitted since creation, delivered or not.
    #[must_use]
    pub fn emitted_count(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Default for NarrationEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl std::fmt::Debug for NarrationEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrationEmitter")
            .field("subscribers", &self.subscriber_count())
            .field("emitted", &self.emitted_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use steward_core::{message_event, MessageId, StreamRole};

    use super::*;

    fn chunk(text: &str) -> NarrationEvent {
        message_event(&MessageId::from("msg-1"), StreamRole::Conversational, text)
    }

    #[tokio::test]
    async fn delivers_to_subscriber_in_order() {
        let emitter = NarrationEmitter::new(16);
        let mut rx = emitter.subscribe();

        assert_eq!(emitter.emit(chunk("first")), 1);
        assert_eq!(emitter.emit(chunk("second")), 1);

        let NarrationEvent::Message { content, .. } = rx.recv().await.unwrap() else {
            panic!("expected message event");
        };
        assert_eq!(content, "first");
        let NarrationEvent::Message { content, .. } = rx.recv().await.unwrap() else {
            panic!("expected message event");
        };
        assert_eq!(content, "second");
    }

    #[tokio::test]
    async fn emit_without_subscribers_returns_zero() {
        let emitter = NarrationEmitter::new(16);
        assert_eq!(emitter.emit(chunk("nobody home")), 0);
        assert_eq!(emitter.emitted_count(), 1);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive() {
        let emitter = NarrationEmitter::new(16);
        let mut rx1 = emitter.subscribe();
        let mut rx2 = emitter.subscribe();

        assert_eq!(emitter.emit(chunk("both")), 2);
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let emitter = NarrationEmitter::new(16);
        let _ = emitter.emit(chunk("early"));

        let mut rx = emitter.subscribe();
        let _ = emitter.emit(chunk("late"));

        let NarrationEvent::Message { content, .. } = rx.recv().await.unwrap() else {
            panic!("expected message event");
        };
        assert_eq!(content, "late");
    }

    #[tokio::test]
    async fn lagged_subscriber_drops_oldest_not_newest() {
        let emitter = NarrationEmitter::new(2);
        let mut rx = emitter.subscribe();

        for i in 0..5 {
            let _ = emitter.emit(chunk(&format!("event-{i}")));
        }

        // First recv reports the lag, subsequent ones deliver the newest.
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        let NarrationEvent::Message { content, .. } = rx.recv().await.unwrap() else {
            panic!("expected message event");
        };
        assert_eq!(content, "event-3");
    }

    #[test]
    fn zero_capacity_is_clamped() {
        // broadcast::channel panics on zero; the constructor guards it.
        let emitter = NarrationEmitter::new(0);
        assert_eq!(emitter.subscriber_count(), 0);
    }
}
