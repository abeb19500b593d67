//! Application layer: the orchestrator and its collaborators.
//!
//! - [`Application`] / [`TableManager`]: the capability contract the
//!   surrounding application object must satisfy;
//! - [`SensorSet`]: ordered sensor collection with identity dedup;
//! - [`Orchestrator`]: the lifecycle coordinator for the application's
//!   subsystem graph;
//! - [`ExtraTask`], [`ExtraService`], [`ExtraServiceRegistry`]: user-supplied
//!   background work attached outside the statically-declared graph;
//! - [`ServiceProxy`]: lazy construction of the orchestrator on first
//!   lifecycle use;
//! - [`Worker`]: drives the proxy until an OS signal or natural exit.

mod contract;
mod extra;
mod orchestrator;
mod proxy;
mod worker;

pub use contract::{Application, SensorSet, TableManager};
pub use extra::{ExtraService, ExtraServiceRegistry, ExtraTask};
pub use orchestrator::Orchestrator;
pub use proxy::ServiceProxy;
pub use worker::Worker;
