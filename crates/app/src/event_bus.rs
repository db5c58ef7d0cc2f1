//! In-process event bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use stimlink_domain::event::SessionEvent;

use crate::ports::EventPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped). Clones share the same channel.
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: SessionEvent) -> impl Future<Output = ()> + Send {
        // broadcast::send only fails without receivers.
        let _ = self.sender.send(event);
        async {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stimlink_domain::id::PeripheralId;

    fn reading(rssi: i16) -> SessionEvent {
        SessionEvent::SignalStrength {
            id: PeripheralId::new("dev1"),
            rssi,
        }
    }

    #[tokio::test]
    async fn should_deliver_event_to_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(reading(-60)).await;

        assert_eq!(rx.recv().await.unwrap(), reading(-60));
    }

    #[tokio::test]
    async fn should_deliver_event_to_multiple_subscribers() {
        let bus = InProcessEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.clone().subscribe();

        bus.publish(reading(-61)).await;

        assert_eq!(rx1.recv().await.unwrap(), reading(-61));
        assert_eq!(rx2.recv().await.unwrap(), reading(-61));
    }

    #[tokio::test]
    async fn should_not_deliver_events_published_before_subscription() {
        let bus = InProcessEventBus::new(16);
        bus.publish(reading(-70)).await;

        let mut rx = bus.subscribe();
        bus.publish(reading(-50)).await;

        assert_eq!(rx.recv().await.unwrap(), reading(-50));
    }
}
