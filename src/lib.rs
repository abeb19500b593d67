//! # appvisor
//!
//! **Appvisor** is a supervision-tree lifecycle library for Rust.
//!
//! It provides primitives to compose async services into a dependency graph
//! with ordered startup, reverse-ordered shutdown, and crash propagation, and
//! an [`Orchestrator`] that drives a whole application's subsystems — network
//! clients, sensors, agents, table management — through that graph.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!              ┌──────────────┐      ┌──────────────┐
//!              │ ServiceProxy │      │    Worker    │
//!              │ (lazy build) │◄─────│ (OS signals) │
//!              └──────┬───────┘      └──────────────┘
//!                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator (one per application)                               │
//! │  - resolves the dependency graph from the Application contract    │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! │  - ExtraServiceRegistry (user tasks/services, post-recovery)      │
//! └──┬─────────┬─────────┬─────────┬─────────┬─────────┬─────────┬────┘
//!    ▼         ▼         ▼         ▼         ▼         ▼         ▼
//! sensors  producer  consumer  agents..  router   tables   fetcher
//!    │         │         │         │         │        │        │
//!    │         │   each child owns a Node:   │        │        │
//!    │         │   - State (watch channel)   │        │        │
//!    │         │   - Beacon (supervision)    │        │        │
//!    │         │   - child CancellationToken │        │        │
//!    ▼         ▼         ▼         ▼         ▼        ▼        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                          SubscriberSet
//!                         (per-sub queues)
//!                       ┌───────┼───────┐
//!                       ▼       ▼       ▼
//!                    worker1 worker2 workerN
//! ```
//!
//! ### Lifecycle
//! ```text
//! start():
//!   Init|Stopped|Crashed ─► Starting
//!   ├─► resolve_dependencies()  (mode-dependent graph, fixed for this run)
//!   ├─► on_first_start()        (once ever; zero-agent check, directories)
//!   ├─► child[0] … child[n-1]   (sequential, declared order)
//!   ├─► on_start()              (finalize: the configuration is sealed)
//!   ├─► Started
//!   └─► on_started()
//!         ├─► await recovery barrier   (interruptible by a concurrent stop)
//!         ├─► activate extra tasks / materialize extra services (once)
//!         └─► on_startup_finished()    ("worker ready")
//!
//! stop():
//!   ├─► cancel context ─► on_stop() ─► join tracked futures
//!   ├─► runtime children (newest first) ─► declared children (reversed)
//!   └─► Stopped ─► on_shutdown()  (final stop only)
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                        |
//! |-------------------|------------------------------------------------------------------|-------------------------------------------|
//! | **Services**      | Uniform lifecycle contract and generic start/stop algorithms.    | [`Service`], [`ServiceExt`], [`Node`]     |
//! | **Orchestration** | Drive an application's subsystem graph, mode-dependent topology. | [`Orchestrator`], [`Application`]         |
//! | **Lazy startup**  | Hold a lifecycle handle before any runtime exists.               | [`ServiceProxy`]                          |
//! | **Process entry** | Run until an OS signal, bounded graceful shutdown.               | [`Worker`]                                |
//! | **Extras**        | User background tasks and runtime-attached services.             | [`ExtraTask`], [`ExtraService`]           |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom sinks).     | [`Subscriber`], [`SubscriberSet`]         |
//! | **Errors**        | Typed errors for the lifecycle machinery and background work.    | [`ServiceError`], [`TaskError`]           |
//! | **Configuration** | Centralize runtime settings.                                     | [`Config`]                                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use appvisor::{Node, Service, ServiceError, ServiceExt, ServiceRef};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Producer {
//!     node: Node,
//! }
//!
//! struct Pipeline {
//!     node: Node,
//!     producer: ServiceRef,
//! }
//!
//! #[async_trait]
//! impl Service for Producer {
//!     fn node(&self) -> &Node {
//!         &self.node
//!     }
//!
//!     async fn on_start(&self) -> Result<(), ServiceError> {
//!         // open connections...
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait]
//! impl Service for Pipeline {
//!     fn node(&self) -> &Node {
//!         &self.node
//!     }
//!
//!     fn resolve_dependencies(&self) -> Vec<ServiceRef> {
//!         vec![self.producer.clone()]
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), ServiceError> {
//!     let pipeline = Arc::new(Pipeline {
//!         node: Node::new("pipeline"),
//!         producer: Arc::new(Producer {
//!             node: Node::new("producer"),
//!         }),
//!     });
//!
//!     // The producer starts first and stops last.
//!     pipeline.start().await?;
//!     pipeline.stop().await;
//!     Ok(())
//! }
//! ```
mod app;
mod config;
mod error;
mod events;
mod services;
mod subscribers;
mod web;

// ---- Public re-exports ----

pub use app::{
    Application, ExtraService, ExtraServiceRegistry, ExtraTask, Orchestrator, SensorSet,
    ServiceProxy, TableManager, Worker,
};
pub use config::Config;
pub use error::{ServiceError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use services::{Beacon, Flag, Node, Service, ServiceExt, ServiceRef, State};
pub use subscribers::{Subscriber, SubscriberSet};
pub use web::{Handler, Request, Response, WebFacade};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
