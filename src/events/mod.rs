//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to diagnostics events emitted by the lifecycle
//! machinery, the orchestrator, and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the lifecycle driver (`ServiceExt`), the orchestrator,
//!   the worker, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the orchestrator's subscriber listener, which fans out to
//!   the [`SubscriberSet`](crate::subscribers::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
