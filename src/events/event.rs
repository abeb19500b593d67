//! # Lifecycle events emitted by the supervision tree.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: service state flow (starting, started, stopping, stopped, crashed, restarting)
//! - **Supervision events**: runtime attachment, background-task failures, recovery short-circuit
//! - **Shutdown events**: signal observed, grace exceeded
//! - **Subscriber events**: fan-out overflow and panic isolation
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! service label, the child involved, and free-form reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use appvisor::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::ServiceCrashed)
//!     .with_service("table-manager")
//!     .with_reason("recovery log truncated");
//!
//! assert_eq!(ev.kind, EventKind::ServiceCrashed);
//! assert_eq!(ev.service.as_deref(), Some("table-manager"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Service lifecycle events ===
    /// Service entered `Starting`; its dependency graph is now fixed.
    ///
    /// Sets: `service`, `at`, `seq`.
    ServiceStarting,

    /// Service and every declared child reached `Started`.
    ///
    /// Sets: `service`, `at`, `seq`.
    ServiceStarted,

    /// Service entered `Stopping`; its context token has been cancelled.
    ///
    /// Sets: `service`, `at`, `seq`.
    ServiceStopping,

    /// Service and every child it started reached `Stopped`.
    ///
    /// Sets: `service`, `at`, `seq`.
    ServiceStopped,

    /// Service crashed during start or was crashed by a failing hook.
    ///
    /// Sets: `service`, `reason`, `at`, `seq`.
    ServiceCrashed,

    /// Service is re-entering `Starting` after a stop; one-time hooks are skipped.
    ///
    /// Sets: `service`, `at`, `seq`.
    ServiceRestarting,

    // === Supervision events ===
    /// A child was attached to an already-started parent and started in place.
    ///
    /// Sets: `service` (parent), `child`, `at`, `seq`.
    DependencyAttached,

    /// A tracked background future finished with an error.
    ///
    /// The failure is isolated: it never forces the owning service to stop.
    ///
    /// Sets: `service` (owner), `reason`, `at`, `seq`.
    FutureFailed,

    /// The recovery-barrier wait ended because the service was stopped
    /// concurrently. Early exit, not a failure.
    ///
    /// Sets: `service`, `at`, `seq`.
    RecoveryInterrupted,

    /// Extra tasks and services are live and the application is fully started.
    ///
    /// Sets: `service`, `at`, `seq`.
    StartupFinished,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed).
    ///
    /// Sets: `service`, `at`, `seq`; `reason` when signal registration failed.
    ShutdownRequested,

    /// A child's stop exceeded the configured stop grace and was abandoned.
    ///
    /// Sets: `service` (parent), `child`, `at`, `seq`.
    StopGraceExceeded,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `service` (subscriber name), `reason`, `at`, `seq`.
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `service` (subscriber name), `reason`, `at`, `seq`.
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Label of the service this event is about, if applicable.
    pub service: Option<Arc<str>>,
    /// Label of the child service involved, if applicable.
    pub child: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            child: None,
            reason: None,
        }
    }

    /// Attaches the service label.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches the label of the child involved.
    #[inline]
    pub fn with_child(mut self, child: impl Into<Arc<str>>) -> Self {
        self.child = Some(child.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }

    /// True for events produced by the subscriber fan-out itself.
    #[inline]
    pub fn is_subscriber_diagnostic(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
