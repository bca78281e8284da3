//! Domain events produced by the seat admission core.
//!
//! Consumers (audit log, notification system, plugin hook dispatcher) are
//! external collaborators: they subscribe to the [`EventBus`] and the core
//! has no knowledge of their downstream handling.

pub mod pool;
pub mod session;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use pool::PoolEvent;
pub use session::SessionEvent;

/// Any event published by the seat admission core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum DomainEvent {
    /// A session lifecycle event.
    Session(SessionEvent),
    /// A seat pool event.
    Pool(PoolEvent),
}

/// In-process broadcast bus for domain events.
///
/// Publishing never fails: if no subscriber is attached the event is
/// dropped, which is the correct behavior for an optional audit tap.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a new event bus with the given subscriber channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: DomainEvent) {
        tracing::debug!(?event, "Publishing domain event");
        let _ = self.sender.send(event);
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::id::{SessionId, UserId};

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        let session_id = SessionId::new();
        let user_id = UserId::new();
        bus.publish(DomainEvent::Session(SessionEvent::Created {
            session_id,
            user_id,
            ip_address: "10.0.0.1".to_string(),
        }));

        match rx.recv().await.expect("event") {
            DomainEvent::Session(SessionEvent::Created { session_id: id, .. }) => {
                assert_eq!(id, session_id);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_benign() {
        let bus = EventBus::new(8);
        bus.publish(DomainEvent::Pool(PoolEvent::DriftDetected {
            delta: 2,
            source: "test".to_string(),
        }));
    }
}
