//! # Service: the uniform lifecycle contract and its generic driver.
//!
//! Every subsystem — producer, consumer, sensors, agents, the orchestrator
//! itself — implements [`Service`] and is driven polymorphically through
//! [`ServiceExt`]; the dependency graph never branches on component kinds.
//!
//! ## Start / stop sequence
//! ```text
//! start():
//!   Init|Stopped|Crashed|Restarting ─► Starting
//!   ├─► fix dependency graph (resolve_dependencies)
//!   ├─► on_first_start()            (once ever, suppressed on restart)
//!   ├─► child[0].start() … child[n-1].start()   (sequential, declared order)
//!   │       └─ failure ─► crash self, propagate ChildStart to caller
//!   ├─► on_start()
//!   ├─► Started                     (only from Starting; a concurrent stop wins)
//!   └─► on_started()                (may await the recovery barrier)
//!
//! stop():
//!   Starting|Started|Crashed ─► Stopping   (no-op from any other state)
//!   ├─► cancel context token        (interrupts barrier waits / futures)
//!   ├─► on_stop()
//!   ├─► join tracked futures
//!   ├─► runtime children, newest first
//!   ├─► child[n-1].stop() … child[0].stop()     (exact reverse)
//!   ├─► Stopped
//!   └─► on_shutdown()               (final stop only, skipped on restart)
//! ```
//!
//! ## Rules
//! - Siblings start strictly in declared order, never concurrently during the
//!   start phase; once all report `Started` they execute concurrently.
//! - A child's unrecovered start failure aborts the parent's start and is
//!   propagated; this layer never retries it.
//! - Runtime-attached children stop in reverse attachment order, ahead of the
//!   declared graph.
//! - A failed background future is published to the bus and isolated; it never
//!   stops the owning service.
//! - `stop()` may overlap a still-running `start()`: the stop cancels the
//!   run's context, the start observes it, abandons the remaining children,
//!   and never overwrites the stopped state.

use std::future::Future;

use async_trait::async_trait;
use tokio::time;

use crate::error::{ServiceError, TaskError};
use crate::events::{Event, EventKind};
use crate::services::{Flag, Node, State};

/// Shared handle to a service in a supervision tree.
pub type ServiceRef = std::sync::Arc<dyn Service>;

/// # Uniform lifecycle contract.
///
/// Implementors supply a [`Node`], a dependency list, and hooks; the generic
/// algorithms live in [`ServiceExt`] and are identical for every service.
///
/// # Example
/// ```
/// use appvisor::{Node, Service, ServiceError};
/// use async_trait::async_trait;
///
/// struct Producer {
///     node: Node,
/// }
///
/// #[async_trait]
/// impl Service for Producer {
///     fn node(&self) -> &Node {
///         &self.node
///     }
///
///     async fn on_start(&self) -> Result<(), ServiceError> {
///         // open connections...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// The lifecycle state of this service.
    fn node(&self) -> &Node;

    /// Human-readable label, used in events and supervision paths.
    fn label(&self) -> &str {
        self.node().label()
    }

    /// Compact label for dense logs.
    fn short_label(&self) -> &str {
        self.label()
    }

    /// Declared children, in start order. Resolved once per run, at the
    /// moment `Starting` begins.
    fn resolve_dependencies(&self) -> Vec<ServiceRef> {
        Vec::new()
    }

    /// Runs once, on the very first start only — never on restart.
    async fn on_first_start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Runs on every start, including restarts, after the children are live.
    async fn on_start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Runs after self and all children reached `Started`.
    async fn on_started(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Runs on stop, before the children stop. Best effort.
    async fn on_stop(&self) {}

    /// Runs on final shutdown, after the service fully stopped. Best effort.
    async fn on_shutdown(&self) {}

    /// Runs on restart, between the stop and the next start. Best effort.
    async fn on_restart(&self) {}
}

/// # Generic lifecycle operations, provided for every [`Service`].
#[async_trait]
pub trait ServiceExt: Service {
    /// Starts this service and its dependency graph.
    ///
    /// See the module docs for the exact sequence. Errors abort the start,
    /// leave the service `Crashed`, and propagate to the caller.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Stops this service, its background futures, and every child it
    /// started, in exact reverse start order. Idempotent from `Init`,
    /// `Stopped`, and `Stopping`.
    async fn stop(&self);

    /// Stops (without the final-shutdown hook), then starts again with
    /// one-time hooks suppressed.
    async fn restart(&self) -> Result<(), ServiceError>;

    /// Waits until this service reaches a terminal state.
    async fn wait_until_stopped(&self);

    /// Waits for `flag`, giving up when this service is stopped concurrently.
    ///
    /// Returns `true` when the wait ended because of the stop — the caller
    /// should skip whatever the flag was gating.
    async fn wait_for_stopped(&self, flag: &Flag) -> bool;

    /// Spawns `fut` as a tracked background activity of this service.
    ///
    /// The future is cancelled automatically when the service stops. An `Err`
    /// outcome is published as [`EventKind::FutureFailed`]; it never stops
    /// the service.
    fn add_future<F>(&self, fut: F)
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static;

    /// Attaches `child` to this already-started service and starts it.
    ///
    /// Runtime children are stopped in reverse attachment order, ahead of the
    /// declared graph. This is the one documented exception to "children
    /// fully start before the parent is started".
    async fn add_runtime_dependency(&self, child: ServiceRef) -> Result<(), ServiceError>;
}

#[async_trait]
impl<S: Service + ?Sized> ServiceExt for S {
    async fn start(&self) -> Result<(), ServiceError> {
        let node = self.node();
        node.enter_starting()
            .map_err(|from| ServiceError::InvalidTransition {
                service: node.label().to_string(),
                from,
                to: State::Starting,
            })?;
        node.set_children(self.resolve_dependencies());
        node.publish(Event::now(EventKind::ServiceStarting).with_service(node.label_arc()));

        if !node.first_start_completed() {
            if let Err(err) = self.on_first_start().await {
                crash(node, &err);
                return Err(err);
            }
            node.mark_first_start();
        }

        for child in node.children() {
            if node.token().is_cancelled() {
                // A concurrent stop already swept past the remaining children.
                return Ok(());
            }
            child.node().beacon().reattach(node.beacon());
            child.node().rebind_context(node);
            if let Err(err) = child.start().await {
                let err = ServiceError::ChildStart {
                    service: child.label().to_string(),
                    source: Box::new(err),
                };
                crash(node, &err);
                return Err(err);
            }
        }

        if let Err(err) = self.on_start().await {
            crash(node, &err);
            return Err(err);
        }

        if !node.try_set_started() {
            // Stopped while starting; the teardown owns the state now.
            return Ok(());
        }
        node.publish(Event::now(EventKind::ServiceStarted).with_service(node.label_arc()));

        if let Err(err) = self.on_started().await {
            crash(node, &err);
            return Err(err);
        }
        Ok(())
    }

    async fn stop(&self) {
        teardown(self, true).await;
    }

    async fn restart(&self) -> Result<(), ServiceError> {
        let node = self.node();
        teardown(self, false).await;
        node.set_restarting();
        node.publish(Event::now(EventKind::ServiceRestarting).with_service(node.label_arc()));
        self.on_restart().await;
        self.start().await
    }

    async fn wait_until_stopped(&self) {
        self.node().wait_for_state(State::is_terminal).await;
    }

    async fn wait_for_stopped(&self, flag: &Flag) -> bool {
        let token = self.node().token();
        tokio::select! {
            _ = flag.wait() => false,
            _ = token.cancelled() => true,
        }
    }

    fn add_future<F>(&self, fut: F)
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let node = self.node();
        let token = node.token();
        let bus = node.bus();
        let label = node.label_arc();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                res = fut => {
                    match res {
                        Ok(()) | Err(TaskError::Canceled) => {}
                        Err(err) => {
                            bus.publish(
                                Event::now(EventKind::FutureFailed)
                                    .with_service(label)
                                    .with_reason(err.as_message()),
                            );
                        }
                    }
                }
            }
        });
        node.track(handle);
    }

    async fn add_runtime_dependency(&self, child: ServiceRef) -> Result<(), ServiceError> {
        let node = self.node();
        child.node().beacon().reattach(node.beacon());
        child.node().rebind_context(node);
        node.push_runtime_child(child.clone());
        node.publish(
            Event::now(EventKind::DependencyAttached)
                .with_service(node.label_arc())
                .with_child(child.node().label_arc()),
        );
        child.start().await
    }
}

/// Marks the node crashed and reports the failure to the supervision tree.
fn crash(node: &Node, err: &ServiceError) {
    node.crash();
    node.publish(
        Event::now(EventKind::ServiceCrashed)
            .with_service(node.label_arc())
            .with_reason(err.as_message()),
    );
}

/// The shared stop sequence; `final_stop` controls the `on_shutdown` hook.
async fn teardown<S: Service + ?Sized>(svc: &S, final_stop: bool) {
    let node = svc.node();
    if !node.enter_stopping() {
        return;
    }
    node.publish(Event::now(EventKind::ServiceStopping).with_service(node.label_arc()));
    node.cancel_context();

    svc.on_stop().await;

    for handle in node.take_futures() {
        let _ = handle.await;
    }

    let mut runtime = node.drain_runtime_children();
    runtime.reverse();
    for child in runtime {
        stop_child(node, &child).await;
    }

    let mut declared = node.children();
    declared.reverse();
    for child in declared {
        stop_child(node, &child).await;
    }

    node.set_stopped();
    node.publish(Event::now(EventKind::ServiceStopped).with_service(node.label_arc()));

    if final_stop {
        svc.on_shutdown().await;
    }
}

/// Stops one child, honoring the parent's stop grace when configured.
async fn stop_child(node: &Node, child: &ServiceRef) {
    match node.stop_grace() {
        None => child.stop().await,
        Some(grace) => {
            if time::timeout(grace, child.stop()).await.is_err() {
                node.publish(
                    Event::now(EventKind::StopGraceExceeded)
                        .with_service(node.label_arc())
                        .with_child(child.node().label_arc()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type OrderLog = Arc<Mutex<Vec<String>>>;

    struct StubService {
        node: Node,
        log: OrderLog,
        children: Vec<ServiceRef>,
        fail_on_start: bool,
    }

    impl StubService {
        fn new(label: &str, log: OrderLog) -> Arc<Self> {
            Arc::new(Self {
                node: Node::new(label.to_string()),
                log,
                children: Vec::new(),
                fail_on_start: false,
            })
        }

        fn with_children(label: &str, log: OrderLog, children: Vec<ServiceRef>) -> Arc<Self> {
            Arc::new(Self {
                node: Node::new(label.to_string()),
                log,
                children,
                fail_on_start: false,
            })
        }

        fn failing(label: &str, log: OrderLog) -> Arc<Self> {
            Arc::new(Self {
                node: Node::new(label.to_string()),
                log,
                children: Vec::new(),
                fail_on_start: true,
            })
        }

        fn record(&self, what: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{what}:{}", self.label()));
        }
    }

    #[async_trait]
    impl Service for StubService {
        fn node(&self) -> &Node {
            &self.node
        }

        fn resolve_dependencies(&self) -> Vec<ServiceRef> {
            self.children.clone()
        }

        async fn on_first_start(&self) -> Result<(), ServiceError> {
            self.record("first");
            Ok(())
        }

        async fn on_start(&self) -> Result<(), ServiceError> {
            self.record("start");
            if self.fail_on_start {
                return Err(ServiceError::Config {
                    reason: format!("{} refused", self.label()),
                });
            }
            Ok(())
        }

        async fn on_stop(&self) {
            self.record("stop");
        }

        async fn on_shutdown(&self) {
            self.record("shutdown");
        }
    }

    fn log() -> OrderLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(log: &OrderLog) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_children_start_in_declared_order_and_stop_reversed() {
        let log = log();
        let a = StubService::new("a", log.clone());
        let b = StubService::new("b", log.clone());
        let parent = StubService::with_children(
            "parent",
            log.clone(),
            vec![a.clone() as ServiceRef, b.clone() as ServiceRef],
        );

        parent.start().await.unwrap();
        assert_eq!(parent.node().state(), State::Started);
        assert_eq!(a.node().state(), State::Started);
        assert_eq!(b.node().state(), State::Started);
        assert_eq!(
            entries(&log),
            vec![
                "first:parent",
                "first:a",
                "start:a",
                "first:b",
                "start:b",
                "start:parent"
            ]
        );

        log.lock().unwrap().clear();
        parent.stop().await;
        assert_eq!(parent.node().state(), State::Stopped);
        assert_eq!(
            entries(&log),
            vec![
                "stop:parent",
                "stop:b",
                "shutdown:b",
                "stop:a",
                "shutdown:a",
                "shutdown:parent"
            ]
        );
    }

    #[tokio::test]
    async fn test_first_start_hook_skipped_on_restart() {
        let log = log();
        let svc = StubService::new("svc", log.clone());
        svc.start().await.unwrap();
        svc.restart().await.unwrap();
        let seen = entries(&log);
        assert_eq!(
            seen.iter().filter(|e| e.as_str() == "first:svc").count(),
            1
        );
        // Restart runs the stop hook but not the final-shutdown hook.
        assert!(seen.contains(&"stop:svc".to_string()));
        assert!(!seen.contains(&"shutdown:svc".to_string()));
        assert_eq!(svc.node().state(), State::Started);
    }

    #[tokio::test]
    async fn test_child_failure_aborts_parent_start() {
        let log = log();
        let a = StubService::new("a", log.clone());
        let broken = StubService::failing("broken", log.clone());
        let parent = StubService::with_children(
            "parent",
            log.clone(),
            vec![a.clone() as ServiceRef, broken.clone() as ServiceRef],
        );

        let err = parent.start().await.unwrap_err();
        match &err {
            ServiceError::ChildStart { service, .. } => assert_eq!(service, "broken"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.origin(), Some("broken"));
        assert_eq!(parent.node().state(), State::Crashed);
        assert_eq!(broken.node().state(), State::Crashed);
        // The earlier sibling was already live; teardown is the supervisor's call.
        assert_eq!(a.node().state(), State::Started);
        assert!(!entries(&log).contains(&"start:parent".to_string()));
    }

    struct SlowStart {
        node: Node,
    }

    #[async_trait]
    impl Service for SlowStart {
        fn node(&self) -> &Node {
            &self.node
        }

        async fn on_start(&self) -> Result<(), ServiceError> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stop_during_start_never_resurrects_the_parent() {
        let log = log();
        let slow = Arc::new(SlowStart {
            node: Node::new("slow"),
        });
        let late = StubService::new("late", log.clone());
        let parent = StubService::with_children(
            "parent",
            log.clone(),
            vec![slow.clone() as ServiceRef, late.clone() as ServiceRef],
        );

        let starter = parent.clone();
        let handle = tokio::spawn(async move { starter.start().await });
        slow.node().wait_for_state(|s| s == State::Starting).await;

        parent.stop().await;
        assert_eq!(parent.node().state(), State::Stopped);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("interrupted start must still return")
            .unwrap()
            .unwrap();
        // The interrupted run must not overwrite the stopped state or keep
        // starting children the teardown already swept past.
        assert_eq!(parent.node().state(), State::Stopped);
        assert_eq!(slow.node().state(), State::Stopped);
        assert_ne!(late.node().state(), State::Started);
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let svc = StubService::new("svc", log());
        svc.start().await.unwrap();
        let err = svc.start().await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let log = log();
        let svc = StubService::new("svc", log.clone());
        svc.stop().await;
        assert_eq!(svc.node().state(), State::Init);
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn test_background_future_failure_is_isolated() {
        let svc = StubService::new("svc", log());
        svc.start().await.unwrap();

        let mut rx = svc.node().bus().subscribe();
        svc.add_future(async {
            Err(TaskError::Fail {
                error: "tick overflow".into(),
            })
        });

        let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ev.kind, EventKind::FutureFailed);
        assert_eq!(ev.service.as_deref(), Some("svc"));
        assert_eq!(svc.node().state(), State::Started);
    }

    #[tokio::test]
    async fn test_background_future_cancelled_on_stop() {
        let svc = StubService::new("svc", log());
        svc.start().await.unwrap();
        svc.add_future(async {
            futures::future::pending::<()>().await;
            Ok(())
        });

        tokio::time::timeout(Duration::from_secs(1), svc.stop())
            .await
            .expect("stop must not hang on tracked futures");
        assert_eq!(svc.node().state(), State::Stopped);
    }

    #[tokio::test]
    async fn test_runtime_children_stop_lifo_before_declared() {
        let log = log();
        let declared = StubService::new("declared", log.clone());
        let parent = StubService::with_children(
            "parent",
            log.clone(),
            vec![declared.clone() as ServiceRef],
        );
        parent.start().await.unwrap();

        let r1 = StubService::new("r1", log.clone());
        let r2 = StubService::new("r2", log.clone());
        parent.add_runtime_dependency(r1.clone()).await.unwrap();
        parent.add_runtime_dependency(r2.clone()).await.unwrap();
        assert_eq!(r1.node().state(), State::Started);
        assert_eq!(r2.node().state(), State::Started);

        log.lock().unwrap().clear();
        parent.stop().await;
        let seen = entries(&log);
        let pos = |needle: &str| seen.iter().position(|e| e == needle).unwrap();
        assert!(pos("stop:r2") < pos("stop:r1"));
        assert!(pos("stop:r1") < pos("stop:declared"));
    }

    #[tokio::test]
    async fn test_wait_for_stopped_short_circuits_on_stop() {
        let svc = StubService::new("svc", log());
        svc.start().await.unwrap();

        let flag = Flag::new();
        let waiter = svc.clone();
        let observed = flag.clone();
        let handle =
            tokio::spawn(async move { waiter.wait_for_stopped(&observed).await });

        svc.stop().await;
        let was_stopped = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(was_stopped);
    }

    #[tokio::test]
    async fn test_wait_for_stopped_returns_false_when_flag_fires() {
        let svc = StubService::new("svc", log());
        svc.start().await.unwrap();

        let flag = Flag::new();
        flag.set();
        assert!(!svc.wait_for_stopped(&flag).await);
    }

    struct SlowStop {
        node: Node,
    }

    #[async_trait]
    impl Service for SlowStop {
        fn node(&self) -> &Node {
            &self.node
        }

        async fn on_stop(&self) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_grace_abandons_hung_child() {
        struct Parent {
            node: Node,
            child: ServiceRef,
        }

        #[async_trait]
        impl Service for Parent {
            fn node(&self) -> &Node {
                &self.node
            }

            fn resolve_dependencies(&self) -> Vec<ServiceRef> {
                vec![self.child.clone()]
            }
        }

        let child: ServiceRef = Arc::new(SlowStop {
            node: Node::new("slow"),
        });
        let parent = Arc::new(Parent {
            node: Node::new("parent").with_stop_grace(Duration::from_millis(100)),
            child,
        });
        parent.start().await.unwrap();

        let mut rx = parent.node().bus().subscribe();
        parent.stop().await;
        assert_eq!(parent.node().state(), State::Stopped);

        let mut saw_grace_event = false;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::StopGraceExceeded {
                assert_eq!(ev.child.as_deref(), Some("slow"));
                saw_grace_event = true;
            }
        }
        assert!(saw_grace_event);
    }
}
