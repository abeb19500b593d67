//! Lifecycle machinery: node state, supervision links, and the service traits.
//!
//! This module contains the generic supervision-tree primitives everything
//! else is built on:
//! - [`State`]: the per-run lifecycle state machine;
//! - [`Flag`]: a one-shot awaitable condition (the recovery-barrier type);
//! - [`Beacon`]: a node's link into the supervision tree, used for failure
//!   visibility and diagnostics, not ownership;
//! - [`Node`]: the lifecycle state carried by every service;
//! - [`Service`] / [`ServiceExt`]: the uniform start/stop/restart contract and
//!   the generic algorithms driving it.
//!
//! ## Ordering rules
//! - Declared children start strictly in declared order, never concurrently
//!   with each other during the start phase.
//! - Stop proceeds in the exact reverse of the realized start order;
//!   runtime-attached children go first, newest first.
//! - A node is `Started` only if every declared child is `Started`; it is
//!   `Stopped` only if every child it started is `Stopped`.

mod beacon;
mod flag;
mod node;
mod service;
mod state;

pub use beacon::Beacon;
pub use flag::Flag;
pub use node::Node;
pub use service::{Service, ServiceExt, ServiceRef};
pub use state::State;
