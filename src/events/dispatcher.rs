//! Ordered subscriber dispatch for reaction events.
//!
//! Subscribers are registered explicitly and invoked in registration order.
//! A subscriber failure is its own to log; the dispatcher never lets one
//! subscriber's outcome affect the others.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::trace;

use super::ReactionEvent;

/// Boxed future type for dyn-safe async subscribers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A subscriber to reaction events.
pub trait ReactionSubscriber: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Handles one reaction event. Errors are the subscriber's to log; the
    /// dispatcher only sequences invocations.
    fn on_reaction<'a>(&'a self, event: &'a ReactionEvent) -> BoxFuture<'a, ()>;
}

/// Dispatches reaction events to an ordered list of subscribers.
#[derive(Default)]
pub struct ReactionDispatcher {
    subscribers: Vec<Arc<dyn ReactionSubscriber>>,
}

impl ReactionDispatcher {
    pub fn new() -> Self {
        ReactionDispatcher {
            subscribers: Vec::new(),
        }
    }

    /// Appends a subscriber. Subscribers run in registration order.
    pub fn subscribe(&mut self, subscriber: Arc<dyn ReactionSubscriber>) {
        self.subscribers.push(subscriber);
    }

    /// True when no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Invokes every subscriber with the event, in order.
    pub async fn dispatch(&self, event: &ReactionEvent) {
        for subscriber in &self.subscribers {
            trace!(
                subscriber = subscriber.name(),
                message = %event.message_id,
                "dispatching reaction event"
            );
            subscriber.on_reaction(event).await;
        }
    }
}
