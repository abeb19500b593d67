//! # Lazy construction of the orchestrator.
//!
//! [`ServiceProxy`] defers building the [`Orchestrator`] until its first
//! lifecycle use. Applications are frequently defined at module scope, long
//! before any async runtime exists; the proxy lets them hold a lifecycle
//! handle immediately while the orchestrator (and its diagnostics wiring) is
//! created on first `start()`/`stop()`/accessor call, inside the runtime.
//!
//! ## Rules
//! - Materialization happens at most once; every caller observes the same
//!   orchestrator instance.
//! - Tasks and services registered before materialization are buffered and
//!   flushed into the orchestrator when it is built, in registration order.
//! - Diagnostics subscribers attach only before materialization.

use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::app::{Application, ExtraService, ExtraTask, Orchestrator};
use crate::config::Config;
use crate::error::ServiceError;
use crate::services::ServiceExt;
use crate::subscribers::Subscriber;

/// Lazy handle to an application's orchestrator.
pub struct ServiceProxy<A: Application> {
    app: Arc<A>,
    cfg: Config,
    subscribers: Mutex<Vec<Arc<dyn Subscriber>>>,
    pending_tasks: Mutex<Vec<ExtraTask<A>>>,
    pending_services: Mutex<Vec<ExtraService>>,
    cell: OnceCell<Arc<Orchestrator<A>>>,
}

impl<A: Application> ServiceProxy<A> {
    /// Creates a proxy for `app`. Nothing is constructed yet.
    pub fn new(app: Arc<A>, cfg: Config) -> Self {
        Self {
            app,
            cfg,
            subscribers: Mutex::new(Vec::new()),
            pending_tasks: Mutex::new(Vec::new()),
            pending_services: Mutex::new(Vec::new()),
            cell: OnceCell::new(),
        }
    }

    /// The application behind this proxy.
    pub fn app(&self) -> &Arc<A> {
        &self.app
    }

    /// Whether the orchestrator has been built.
    pub fn is_materialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Attaches a diagnostics subscriber.
    ///
    /// Returns `false` when the orchestrator already exists; late subscribers
    /// are not attached.
    pub fn add_subscriber(&self, sub: Arc<dyn Subscriber>) -> bool {
        if self.is_materialized() {
            return false;
        }
        self.subscribers.lock().unwrap().push(sub);
        true
    }

    /// Registers a background task, buffering it when the orchestrator does
    /// not exist yet.
    pub fn register_task(&self, task: ExtraTask<A>) {
        match self.cell.get() {
            Some(svc) => svc.register_task(task),
            None => self.pending_tasks.lock().unwrap().push(task),
        }
    }

    /// Registers an extra service, buffering it when the orchestrator does
    /// not exist yet.
    pub fn register_service(&self, service: ExtraService) {
        match self.cell.get() {
            Some(svc) => svc.register_service(service),
            None => self.pending_services.lock().unwrap().push(service),
        }
    }

    /// The orchestrator, built on first call.
    pub fn service(&self) -> Arc<Orchestrator<A>> {
        let svc = Arc::clone(self.cell.get_or_init(|| {
            let subs = std::mem::take(&mut *self.subscribers.lock().unwrap());
            Orchestrator::new(Arc::clone(&self.app), &self.cfg, subs)
        }));
        for task in std::mem::take(&mut *self.pending_tasks.lock().unwrap()) {
            svc.register_task(task);
        }
        for service in std::mem::take(&mut *self.pending_services.lock().unwrap()) {
            svc.register_service(service);
        }
        svc
    }

    /// Starts the orchestrator, building it first when needed.
    pub async fn start(&self) -> Result<(), ServiceError> {
        self.service().start().await
    }

    /// Stops the orchestrator. Building one just to stop it is a no-op by
    /// the lifecycle rules, so an unmaterialized proxy returns immediately.
    pub async fn stop(&self) {
        if let Some(svc) = self.cell.get() {
            svc.stop().await;
        }
    }

    /// Restarts the orchestrator.
    pub async fn restart(&self) -> Result<(), ServiceError> {
        self.service().restart().await
    }

    /// Waits until the orchestrator reaches a terminal state.
    pub async fn wait_until_stopped(&self) {
        self.service().wait_until_stopped().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{SensorSet, TableManager};
    use crate::services::{Flag, Node, Service, ServiceRef, State};
    use async_trait::async_trait;

    struct Noop {
        node: Node,
    }

    impl Noop {
        fn new(label: &str) -> Arc<Self> {
            Arc::new(Self {
                node: Node::new(label.to_string()),
            })
        }
    }

    #[async_trait]
    impl Service for Noop {
        fn node(&self) -> &Node {
            &self.node
        }
    }

    struct NoopTables {
        node: Node,
        recovery: Flag,
    }

    #[async_trait]
    impl Service for NoopTables {
        fn node(&self) -> &Node {
            &self.node
        }
    }

    impl TableManager for NoopTables {
        fn recovery_completed(&self) -> Flag {
            self.recovery.clone()
        }
    }

    struct MiniApp {
        sensors: SensorSet,
        producer: ServiceRef,
        consumer: ServiceRef,
        reply_consumer: ServiceRef,
        topic_router: ServiceRef,
        fetcher: ServiceRef,
        tables: Arc<NoopTables>,
    }

    impl MiniApp {
        fn new() -> Arc<Self> {
            let recovery = Flag::new();
            recovery.set();
            Arc::new(Self {
                sensors: SensorSet::new(),
                producer: Noop::new("producer") as ServiceRef,
                consumer: Noop::new("consumer") as ServiceRef,
                reply_consumer: Noop::new("reply-consumer") as ServiceRef,
                topic_router: Noop::new("topic-router") as ServiceRef,
                fetcher: Noop::new("fetcher") as ServiceRef,
                tables: Arc::new(NoopTables {
                    node: Node::new("tables"),
                    recovery,
                }),
            })
        }
    }

    #[async_trait]
    impl Application for MiniApp {
        fn label(&self) -> &str {
            "mini"
        }

        fn client_only(&self) -> bool {
            true
        }

        fn monitor(&self) -> ServiceRef {
            Noop::new("monitor")
        }

        fn sensors(&self) -> &SensorSet {
            &self.sensors
        }

        fn agents(&self) -> Vec<ServiceRef> {
            vec![Noop::new("agent") as ServiceRef]
        }

        fn producer(&self) -> ServiceRef {
            self.producer.clone()
        }

        fn consumer(&self) -> ServiceRef {
            self.consumer.clone()
        }

        fn reply_consumer(&self) -> ServiceRef {
            self.reply_consumer.clone()
        }

        fn leader_assignor(&self) -> ServiceRef {
            Noop::new("leader-assignor")
        }

        fn topic_router(&self) -> ServiceRef {
            self.topic_router.clone()
        }

        fn table_manager(&self) -> Arc<dyn TableManager> {
            self.tables.clone()
        }

        fn fetcher(&self) -> ServiceRef {
            self.fetcher.clone()
        }

        fn create_directories(&self) -> Result<(), ServiceError> {
            Ok(())
        }

        fn finalize(&self) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    #[test]
    fn test_registrations_buffer_until_first_use() {
        let proxy = ServiceProxy::new(MiniApp::new(), Config::default());
        proxy.register_task(ExtraTask::no_arg(|| async { Ok(()) }));
        proxy.register_service(ExtraService::instance(Noop::new("extra")));
        assert!(!proxy.is_materialized());

        let svc = proxy.service();
        assert!(proxy.is_materialized());
        assert_eq!(svc.extras().tasks().len(), 1);
    }

    #[test]
    fn test_every_caller_observes_the_same_instance() {
        let proxy = ServiceProxy::new(MiniApp::new(), Config::default());
        let first = proxy.service();
        let second = proxy.service();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_late_subscribers_are_rejected() {
        struct Quiet;
        #[async_trait]
        impl Subscriber for Quiet {
            fn name(&self) -> &'static str {
                "quiet"
            }
            async fn handle(&self, _ev: &crate::events::Event) {}
        }

        let proxy = ServiceProxy::new(MiniApp::new(), Config::default());
        assert!(proxy.add_subscriber(Arc::new(Quiet)));
        let _ = proxy.service();
        assert!(!proxy.add_subscriber(Arc::new(Quiet)));
    }

    #[tokio::test]
    async fn test_lifecycle_delegates_to_the_orchestrator() {
        let proxy = ServiceProxy::new(MiniApp::new(), Config::default());
        proxy.start().await.unwrap();
        assert_eq!(proxy.service().node().state(), State::Started);
        proxy.stop().await;
        assert_eq!(proxy.service().node().state(), State::Stopped);
    }

    #[tokio::test]
    async fn test_stop_without_materialization_is_a_noop() {
        let proxy = ServiceProxy::new(MiniApp::new(), Config::default());
        proxy.stop().await;
        assert!(!proxy.is_materialized());
    }
}
