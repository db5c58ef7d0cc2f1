//! Event bus port: publish/subscribe for session events.

use std::future::Future;

use stimlink_domain::event::SessionEvent;

/// Publishes session events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    ///
    /// Publishing is fire-and-forget: a missing audience is not an error.
    fn publish(&self, event: SessionEvent) -> impl Future<Output = ()> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: SessionEvent) -> impl Future<Output = ()> + Send {
        (**self).publish(event)
    }
}
