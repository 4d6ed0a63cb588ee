//! Live-reload events and per-connection sinks
//!
//! Every open live-reload stream owns one [`EventSink`], a small bounded
//! queue. Publishing never waits: [`non_blocking_send`] offers the event and
//! drops it for that sink when the queue is full. Events are hints to
//! re-fetch, so a dropped event is harmless as long as a later one gets
//! through.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::registry::FileId;

/// Default capacity of a sink queue
pub const DEFAULT_SINK_CAPACITY: usize = 4;

/// Identifier of a subscribed sink
pub type SinkId = u64;

// ============================================================================
// Event
// ============================================================================

/// Notification pushed to connected browser tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Registry shape changed; clients refetch the group list
    Update,

    /// Content of a tracked file changed on disk
    FileChanged { id: FileId },
}

impl Event {
    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::FileChanged { .. } => "file-changed",
        }
    }

    /// JSON payload on the wire
    pub fn data(&self) -> String {
        match self {
            Self::Update => json!({}).to_string(),
            Self::FileChanged { id } => json!({ "id": id }).to_string(),
        }
    }

    /// Render as a raw `text/event-stream` frame
    pub fn to_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.name(), self.data())
    }
}

// ============================================================================
// Delivery policy
// ============================================================================

/// Result of offering an event to one sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the sink
    Delivered,

    /// Sink queue was full; the event was dropped for this sink only
    Dropped,

    /// Receiving side is gone; the sink should be forgotten
    Closed,
}

/// Offer `event` to a sink without waiting.
///
/// A full queue drops the event for that sink. The publisher and the other
/// sinks are never held up by a slow reader.
pub fn non_blocking_send(sender: &mpsc::Sender<Event>, event: Event) -> Delivery {
    match sender.try_send(event) {
        Ok(()) => Delivery::Delivered,
        Err(TrySendError::Full(_)) => Delivery::Dropped,
        Err(TrySendError::Closed(_)) => Delivery::Closed,
    }
}

// ============================================================================
// Sink
// ============================================================================

/// Receiving end of one subscriber's bounded event queue.
///
/// The sink ends (yields `None`) once the registry drops its sending half,
/// either through unsubscribe or at shutdown.
#[derive(Debug)]
pub struct EventSink {
    id: SinkId,
    receiver: mpsc::Receiver<Event>,
}

impl EventSink {
    /// Create a sink and the sender the registry keeps for it
    pub(crate) fn channel(id: SinkId, capacity: usize) -> (mpsc::Sender<Event>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, Self { id, receiver })
    }

    /// Create a sink that is already closed
    pub(crate) fn closed(id: SinkId) -> Self {
        let (_, sink) = Self::channel(id, 1);
        sink
    }

    /// Sink identifier, used to unsubscribe
    pub fn id(&self) -> SinkId {
        self.id
    }

    /// Wait for the next event; `None` once the sink is closed and drained
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Take a queued event without waiting
    pub fn try_recv(&mut self) -> Result<Event, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Whether the sending half has been dropped
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl Stream for EventSink {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

// ============================================================================
// Tests
// ============================================================================
