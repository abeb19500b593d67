//! # Event subscribers for the appvisor runtime.
//!
//! This module provides the [`Subscriber`] trait, the non-blocking
//! [`SubscriberSet`] fan-out, and a built-in [`LogWriter`] (behind the
//! `logging` feature).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   lifecycle driver ── publish(Event) ──► Bus ──► orchestrator listener
//!                                                       │
//!                                                SubscriberSet::emit
//!                                              ┌────────┼────────┐
//!                                              ▼        ▼        ▼
//!                                          [queue S1][queue S2][queue SN]
//!                                              ▼        ▼        ▼
//!                                           worker   worker   worker
//!                                              ▼        ▼        ▼
//!                                        S1.handle  S2.handle  SN.handle
//! ```
//!
//! ## Implementing custom subscribers
//! ```rust
//! use appvisor::{Subscriber, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct CrashCounter;
//!
//! #[async_trait]
//! impl Subscriber for CrashCounter {
//!     fn name(&self) -> &'static str { "crash-counter" }
//!
//!     async fn handle(&self, event: &Event) {
//!         if event.kind == EventKind::ServiceCrashed {
//!             // increment a metric...
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscriber;
