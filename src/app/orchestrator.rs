//! # Orchestrator: the lifecycle coordinator for an application's subsystems.
//!
//! The [`Orchestrator`] is itself a [`Service`]. It computes its dependency
//! graph from the application's mode, delegates the application's lifecycle
//! hooks at the documented points, gates "fully started" on the recovery
//! barrier, and supervises user-registered extra tasks and services.
//!
//! ## Topology
//! ```text
//! client-only:
//!   [producer, consumer, reply_consumer, topic_router, fetcher]
//!
//! server:
//!   [sensors..., producer, consumer, leader_assignor, reply_consumer,
//!    agents..., topic_router, table_manager, fetcher]
//! ```
//!
//! Resolving the server graph has one side effect: the built-in monitor is
//! appended to the application's sensor collection (identity-deduped), its
//! beacon is re-parented under the orchestrator, and its scheduling context
//! is rebound — the monitor is present even when the user supplied their own.
//!
//! ## Rules
//! - Sensors always start first and stop last.
//! - The producer always stops after the consumer.
//! - A stop issued while the recovery wait is pending interrupts the wait;
//!   extra tasks/services are then never activated and the ready callback is
//!   never invoked.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::app::{Application, ExtraService, ExtraServiceRegistry, ExtraTask};
use crate::config::Config;
use crate::error::ServiceError;
use crate::events::{Bus, Event, EventKind};
use crate::services::{Node, Service, ServiceExt, ServiceRef};
use crate::subscribers::{Subscriber, SubscriberSet};

/// Lifecycle coordinator for an application's subsystem graph.
pub struct Orchestrator<A: Application> {
    app: Arc<A>,
    node: Node,
    extras: ExtraServiceRegistry<A>,
    pending_subscribers: Mutex<Vec<Arc<dyn Subscriber>>>,
    fanout: Mutex<Option<Arc<SubscriberSet>>>,
}

impl<A: Application> Orchestrator<A> {
    /// Creates the orchestrator for `app`.
    ///
    /// Construction is side-effect free with respect to the concurrency
    /// runtime: no task is spawned and no scheduler is touched until the
    /// first start. Prefer going through
    /// [`ServiceProxy`](crate::app::ServiceProxy), which also defers this
    /// constructor itself.
    pub fn new(app: Arc<A>, cfg: &Config, subscribers: Vec<Arc<dyn Subscriber>>) -> Arc<Self> {
        let label: Arc<str> = app.label().into();
        let mut node = Node::with_bus(label, Bus::new(cfg.bus_capacity_clamped()));
        if let Some(grace) = cfg.stop_grace {
            node = node.with_stop_grace(grace);
        }
        Arc::new(Self {
            app,
            node,
            extras: ExtraServiceRegistry::new(),
            pending_subscribers: Mutex::new(subscribers),
            fanout: Mutex::new(None),
        })
    }

    /// The application this orchestrator coordinates.
    pub fn app(&self) -> &Arc<A> {
        &self.app
    }

    /// The diagnostics bus of this supervision tree.
    pub fn bus(&self) -> Bus {
        self.node.bus()
    }

    /// Registers a background task callable, activated after the recovery
    /// barrier clears on every start.
    pub fn register_task(&self, task: ExtraTask<A>) {
        self.extras.register_task(task);
    }

    /// Registers an extra service, materialized and attached at most once.
    pub fn register_service(&self, service: ExtraService) {
        self.extras.register_service(service);
    }

    /// The extra task/service registry.
    pub fn extras(&self) -> &ExtraServiceRegistry<A> {
        &self.extras
    }

    /// Wires the subscriber fan-out to the bus. Runs once, on first start.
    fn init_diagnostics(&self) {
        let subs = std::mem::take(&mut *self.pending_subscribers.lock().unwrap());
        if subs.is_empty() {
            return;
        }
        let bus = self.node.bus();
        let set = Arc::new(SubscriberSet::new(subs, bus.clone()));
        let mut rx = bus.subscribe();
        let fanout = Arc::clone(&set);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => fanout.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *self.fanout.lock().unwrap() = Some(set);
    }

    /// Components started in client-only mode: just enough to publish and
    /// receive replies, no table/agent machinery.
    fn client_components(&self) -> Vec<ServiceRef> {
        vec![
            self.app.producer(),
            self.app.consumer(),
            self.app.reply_consumer(),
            self.app.topic_router(),
            self.app.fetcher(),
        ]
    }

    /// Components started in server mode.
    ///
    /// Side effect: registers the built-in monitor in the sensor collection
    /// and re-parents it under this orchestrator, in case the monitor was
    /// created by the user.
    fn server_components(&self) -> Vec<ServiceRef> {
        let monitor = self.app.monitor();
        monitor.node().beacon().reattach(self.node.beacon());
        monitor.node().rebind_context(&self.node);
        self.app.sensors().register(monitor);

        let mut graph: Vec<ServiceRef> = Vec::new();
        // Sensors observe everything: first up, last down.
        graph.extend(self.app.sensors().snapshot());
        // The producer always stops after the consumer.
        graph.push(self.app.producer());
        graph.push(self.app.consumer());
        graph.push(self.app.leader_assignor());
        graph.push(self.app.reply_consumer());
        graph.extend(self.app.agents());
        graph.push(self.app.topic_router());
        let tables: ServiceRef = self.app.table_manager();
        graph.push(tables);
        graph.push(self.app.fetcher());
        graph
    }

    /// Activates registered extra tasks as tracked background activities.
    fn activate_extra_tasks(&self) {
        for task in self.extras.tasks() {
            self.add_future(task.invoke(Arc::clone(&self.app)));
        }
    }

    /// Materializes and attaches registered extra services, at most once.
    ///
    /// A failing extra service is an isolated fault: it is reported to the
    /// supervision tree and never stops the orchestrator.
    async fn activate_extra_services(&self) {
        let Some(services) = self.extras.materialize(&self.node) else {
            return;
        };
        for svc in services {
            if let Err(err) = self.add_runtime_dependency(Arc::clone(&svc)).await {
                self.node.publish(
                    Event::now(EventKind::ServiceCrashed)
                        .with_service(self.node.label_arc())
                        .with_child(svc.node().label_arc())
                        .with_reason(err.as_message()),
                );
            }
        }
    }
}

#[async_trait]
impl<A: Application> Service for Orchestrator<A> {
    fn node(&self) -> &Node {
        &self.node
    }

    fn short_label(&self) -> &str {
        self.app.short_label()
    }

    fn resolve_dependencies(&self) -> Vec<ServiceRef> {
        if self.app.client_only() {
            self.client_components()
        } else {
            self.server_components()
        }
    }

    async fn on_first_start(&self) -> Result<(), ServiceError> {
        self.init_diagnostics();
        self.app.create_directories()?;
        if self.app.agents().is_empty() {
            return Err(ServiceError::Config {
                reason: "attempting to start an application that has no agents".into(),
            });
        }
        self.app.on_first_start().await
    }

    async fn on_start(&self) -> Result<(), ServiceError> {
        // Seals the configuration: no structural mutation past this point.
        self.app.finalize()?;
        self.app.on_start().await
    }

    async fn on_started(&self) -> Result<(), ServiceError> {
        let recovery = self.app.table_manager().recovery_completed();
        if self.wait_for_stopped(&recovery).await {
            self.node.publish(
                Event::now(EventKind::RecoveryInterrupted).with_service(self.node.label_arc()),
            );
            return Ok(());
        }

        self.activate_extra_tasks();
        self.activate_extra_services().await;

        self.app.on_startup_finished().await;
        self.node
            .publish(Event::now(EventKind::StartupFinished).with_service(self.node.label_arc()));
        self.app.on_started().await
    }

    async fn on_stop(&self) {
        self.app.on_stop().await;
    }

    async fn on_shutdown(&self) {
        self.app.on_shutdown().await;
    }

    async fn on_restart(&self) {
        self.app.on_restart().await;
    }
}
