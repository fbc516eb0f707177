//! # Event Bus System
//!
//! Broadcasts typed notifications from the playback core to any number of
//! observers (UI, diagnostics view, host integrations) using a
//! `broadcast` channel.
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wraps per-domain enums ([`PlaybackEvent`], [`CacheEvent`])
//! - **EventBus**: Cloneable publisher, one per player instance
//! - **EventStream**: Receiver wrapper with optional filtering
//!
//! Events are notifications only. Nothing in the core reads them back to make
//! decisions, and emitting with no subscribers is not an error worth acting on.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut errors = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Playback(PlaybackEvent::TrackFailed { .. })));
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::TrackFailed {
//!     track_id: "t1".to_string(),
//!     reason: "timeout".to_string(),
//!     attempts: 3,
//! }))
//! .ok();
//!
//! let event = errors.recv().await.unwrap();
//! assert_eq!(event.description(), "Track failed after retries");
//! # }
//! ```

use core_async::sync::broadcast::{
    self,
    error::{RecvError, SendError},
    Receiver,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default per-subscriber buffer.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback and queue events
    Playback(PlaybackEvent),
    /// Stream cache events
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::TrackFailed { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::PlayRejected { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::AttemptFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::BackendDegraded { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::TrackChanged { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::QueueEnded) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by the player engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The projected playback status changed.
    StatusChanged {
        /// Active track, if any.
        track_id: Option<String>,
        /// New status name (`idle`, `loading`, `buffering`, `playing`, `paused`, `error`).
        status: String,
    },
    /// A different track became current.
    TrackChanged {
        /// The new current track.
        track_id: String,
        /// Position in the queue sequence.
        index: usize,
    },
    /// One resolution attempt failed and will be retried (or was the last).
    AttemptFailed {
        track_id: String,
        attempt: u32,
        reason: String,
    },
    /// Every attempt failed; the track is in error status.
    TrackFailed {
        track_id: String,
        reason: String,
        attempts: u32,
    },
    /// The host refused to start playback; a user gesture is needed.
    PlayRejected {
        track_id: String,
    },
    /// The last track of a non-repeating queue finished.
    QueueEnded,
    /// The next track's stream was warmed ahead of time.
    Preloaded {
        track_id: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StatusChanged { .. } => "Playback status changed",
            PlaybackEvent::TrackChanged { .. } => "Current track changed",
            PlaybackEvent::AttemptFailed { .. } => "Stream attempt failed",
            PlaybackEvent::TrackFailed { .. } => "Track failed after retries",
            PlaybackEvent::PlayRejected { .. } => "Playback rejected by host",
            PlaybackEvent::QueueEnded => "Queue ended",
            PlaybackEvent::Preloaded { .. } => "Next track preloaded",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events emitted by the stream cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A URL was confirmed by sustained playback and persisted.
    Confirmed {
        /// Cache key (`trackId:quality`).
        key: String,
    },
    /// An entry was removed.
    Evicted {
        key: String,
        /// `failure_threshold`, `fatal`, `expired` or `invalidated`.
        reason: String,
    },
    /// The primary backend failed and the fallback took over.
    BackendDegraded {
        from: String,
        to: String,
    },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Confirmed { .. } => "Stream URL confirmed",
            CacheEvent::Evicted { .. } => "Stream URL evicted",
            CacheEvent::BackendDegraded { .. } => "Cache backend degraded",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning shares the underlying channel. Slow subscribers get
/// `RecvError::Lagged` instead of blocking publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
