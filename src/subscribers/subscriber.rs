//! # Core subscriber trait.
//!
//! [`Subscriber`] is the extension point for plugging custom event handlers
//! into the runtime. Each subscriber is driven by a dedicated worker loop fed
//! by a bounded queue owned by the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching, retries); they do **not**
//!   block the publisher nor other subscribers.
//! - Each subscriber declares its preferred queue capacity via
//!   [`Subscriber::queue_capacity`]. If a queue overflows, events for that
//!   subscriber are dropped and a
//!   [`SubscriberOverflow`](crate::events::EventKind::SubscriberOverflow)
//!   event is published.

use async_trait::async_trait;

use crate::events::Event;

/// Asynchronous handler of runtime events.
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Returns a stable name used in overflow/panic diagnostics.
    fn name(&self) -> &'static str;

    /// Processes one event. Runs on the subscriber's own worker.
    async fn handle(&self, event: &Event);

    /// Preferred bounded-queue capacity for this subscriber.
    fn queue_capacity(&self) -> usize {
        256
    }
}
