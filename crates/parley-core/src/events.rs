//! Room event bus: broadcast status events to subscribers

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

/// A status event emitted during an orchestration pass
#[derive(Debug, Clone)]
pub enum RoomEvent {
    MessageAppended { room_id: String, message_id: String },
    SummaryUpdated { room_id: String, version: i64 },
    NotificationCreated { room_id: String, recipient_id: String },
}

impl RoomEvent {
    pub fn room_id(&self) -> &str {
        match self {
            Self::MessageAppended { room_id, .. }
            | Self::SummaryUpdated { room_id, .. }
            | Self::NotificationCreated { room_id, .. } => room_id,
        }
    }
}

/// Broadcast event bus. An instance is injected wherever events are needed;
/// there is no process-wide registry.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<RoomEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to all events (each subscriber gets its own receiver)
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to one room's events; drop the stream to cancel
    pub fn subscribe_room(&self, room_id: impl Into<String>) -> RoomEvents {
        RoomEvents {
            room_id: room_id.into(),
            rx: self.sender.subscribe(),
        }
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, event: RoomEvent) {
        let receivers = self.sender.receiver_count();
        if receivers > 0 {
            debug!(
                "Publishing event for room {} to {} receivers",
                event.room_id(),
                receivers
            );
            // No receivers is fine; ignore send errors
            let _ = self.sender.send(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Lazy per-subscriber sequence of one room's events
pub struct RoomEvents {
    room_id: String,
    rx: broadcast::Receiver<RoomEvent>,
}

impl RoomEvents {
    /// Next event for the room, or `None` once the bus is gone. A lagged
    /// subscriber skips what it missed and keeps going.
    pub async fn recv(&mut self) -> Option<RoomEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.room_id() == self.room_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Room event subscriber lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
