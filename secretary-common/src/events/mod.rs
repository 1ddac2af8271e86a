//! Event types for AI Secretary components
//!
//! Provides shared event definitions and the EventBus used to fan playback
//! state out to any number of views.

mod playback_types;

pub use playback_types::{PlaybackPhase, PlaybackStatus, TrackId};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// AI Secretary event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecretaryEvent {
    /// Playback session changed phase
    ///
    /// Emitted once per transition, in transition order.
    PlaybackStatusChanged {
        /// Session state after the transition
        status: PlaybackStatus,
        /// When the transition happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback position update for the active recording
    ///
    /// Emitted periodically while Playing; consumers may drop these freely.
    PlaybackProgress {
        track_id: TrackId,
        position_ms: u64,
        /// Total length, known once the payload is decoded
        duration_ms: Option<u64>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SecretaryEvent {
    pub fn status_changed(status: PlaybackStatus) -> Self {
        SecretaryEvent::PlaybackStatusChanged {
            status,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Variant name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SecretaryEvent::PlaybackStatusChanged { .. } => "PlaybackStatusChanged",
            SecretaryEvent::PlaybackProgress { .. } => "PlaybackProgress",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use secretary_common::events::{EventBus, PlaybackStatus, SecretaryEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SecretaryEvent::status_changed(PlaybackStatus::idle()));
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SecretaryEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow subscribers lag
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SecretaryEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SecretaryEvent,
    ) -> Result<usize, broadcast::error::SendError<SecretaryEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SecretaryEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
