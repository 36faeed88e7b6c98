//! Graph-wide event bus
//!
//! One bus is owned by the [`EntityRegistry`](crate::application::EntityRegistry)
//! and shared with every EVSE controller it creates. Status changes, data
//! changes and the request/response pair of each gated operation all go
//! through it. Controllers publish while holding their EVSE's locks, so the
//! messages of one EVSE arrive in the order they happened: a request is
//! always seen before its response.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::events::{Event, EventMessage};

pub const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast channel of [`EventMessage`]s.
///
/// Publishing never blocks and never fails. A subscriber that falls more
/// than `capacity` messages behind skips the oldest ones.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn publish(&self, event: Event) {
        let message = EventMessage::new(event);
        let event_type = message.event.event_type();
        let evse_id = message.event.evse_id().map(ToString::to_string);
        let tracking_id = message.event.event_tracking_id().map(|id| id.to_string());

        match self.sender.send(message) {
            Ok(count) => {
                debug!(event_type, ?evse_id, ?tracking_id, subscribers = count, "Event published");
            }
            Err(_) => {
                debug!(event_type, ?evse_id, ?tracking_id, "Event published (no subscribers)");
            }
        }
    }

    /// Only messages published after this call are received.
    pub fn subscribe(&self) -> EventSubscriber {
        let receiver = self.sender.subscribe();
        let count = self.subscriber_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(total = count, "New event subscriber");

        EventSubscriber {
            receiver,
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of the bus; dropping it unregisters the subscriber.
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    /// Wait for the next message. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(missed = count, "Subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return None;
                }
            }
        }
    }

    /// Next already-published message, without waiting
    pub fn try_recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(missed = count, "Subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain every already-published message
    pub fn drain(&mut self) -> Vec<EventMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        let prev = self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
        info!(remaining = prev.saturating_sub(1), "Event subscriber disconnected");
    }
}

pub type SharedEventBus = Arc<EventBus>;

/// Bus handed to [`EntityRegistry::new`](crate::application::EntityRegistry::new)
pub fn create_event_bus(capacity: usize) -> SharedEventBus {
    Arc::new(EventBus::with_capacity(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::StatusChangedEvent;
    use crate::domain::evse::EvseStatusType;
    use crate::domain::ids::EventTrackingId;
    use crate::domain::timestamped::Timestamped;
    use chrono::Utc;

    fn status_event() -> Event {
        let now = Utc::now();
        Event::EvseStatusChanged(StatusChangedEvent {
            id: "DE*GEF*E1*1".parse().unwrap(),
            old: Timestamped::new(now, EvseStatusType::Available),
            new: Timestamped::new(now, EvseStatusType::Charging),
            event_tracking_id: EventTrackingId::new(),
            timestamp: now,
        })
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        bus.publish(status_event());

        let received = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            subscriber.recv(),
        )
        .await
        .expect("Timeout")
        .expect("No message");

        assert_eq!(received.event.event_type(), "evse_status_changed");
    }

    #[test]
    fn test_subscriber_count() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let sub1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(sub1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        bus.publish(status_event());
        let mut late = bus.subscribe();
        assert!(late.try_recv().is_none());
    }

    #[test]
    fn test_lagging_subscriber_skips_to_retained_messages() {
        let bus = EventBus::with_capacity(2);
        let mut subscriber = bus.subscribe();
        for _ in 0..5 {
            bus.publish(status_event());
        }
        assert_eq!(subscriber.drain().len(), 2);
    }
}
