//! # Extra tasks and services attached outside the static graph.
//!
//! Users can register ad-hoc background work at any time before or during
//! startup; the orchestrator activates it after the recovery barrier clears:
//!
//! - [`ExtraTask`]: an async callable producing a fresh future per
//!   activation. The two variants mirror the declared parameter arity of the
//!   original callable: zero-parameter callables run bare, one-parameter
//!   callables receive the application handle.
//! - [`ExtraService`]: either a ready service instance or a factory invoked
//!   with the orchestrator's node so the new service can bind to its
//!   supervision link and scheduling context.
//! - [`ExtraServiceRegistry`]: the ordered registry with the one-shot
//!   materialization guard — services are materialized at most once across
//!   the orchestrator's lifetime, even across restarts.

use std::sync::Mutex;

use futures::future::BoxFuture;

use crate::error::TaskError;
use crate::services::{Node, ServiceRef};

type TaskFuture = BoxFuture<'static, Result<(), TaskError>>;

/// User-registered background callable, activated once per start.
///
/// Each activation produces a **new** future owning its own state, the same
/// pattern as a function-backed task: no hidden mutation between runs.
pub enum ExtraTask<A> {
    /// Callable taking no arguments.
    NoArg(Box<dyn Fn() -> TaskFuture + Send + Sync>),
    /// Callable receiving the application handle.
    WithApp(Box<dyn Fn(std::sync::Arc<A>) -> TaskFuture + Send + Sync>),
}

impl<A> ExtraTask<A> {
    /// Wraps a zero-argument async callable.
    pub fn no_arg<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        ExtraTask::NoArg(Box::new(move || Box::pin(f())))
    }

    /// Wraps an async callable that receives the application handle.
    pub fn with_app<F, Fut>(f: F) -> Self
    where
        F: Fn(std::sync::Arc<A>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        ExtraTask::WithApp(Box::new(move |app| Box::pin(f(app))))
    }

    /// Produces a fresh future for one activation, passing the application
    /// handle only to the variant that declared it.
    pub fn invoke(&self, app: std::sync::Arc<A>) -> TaskFuture {
        match self {
            ExtraTask::NoArg(f) => f(),
            ExtraTask::WithApp(f) => f(app),
        }
    }
}

/// User-registered service: an instance used as-is, or a factory bound to the
/// orchestrator at materialization time.
pub enum ExtraService {
    /// Already-constructed service, used unmodified.
    Instance(ServiceRef),
    /// Factory receiving the orchestrator's node for beacon/context binding.
    Factory(Box<dyn Fn(&Node) -> ServiceRef + Send + Sync>),
}

impl ExtraService {
    /// Wraps a ready instance.
    pub fn instance(svc: ServiceRef) -> Self {
        ExtraService::Instance(svc)
    }

    /// Wraps a constructor.
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&Node) -> ServiceRef + Send + Sync + 'static,
    {
        ExtraService::Factory(Box::new(f))
    }

    fn materialize(&self, parent: &Node) -> ServiceRef {
        match self {
            ExtraService::Instance(svc) => svc.clone(),
            ExtraService::Factory(f) => f(parent),
        }
    }
}

/// Ordered registry of extra tasks and services with a one-shot
/// materialization guard.
pub struct ExtraServiceRegistry<A> {
    tasks: Mutex<Vec<std::sync::Arc<ExtraTask<A>>>>,
    services: Mutex<Vec<ExtraService>>,
    materialized: Mutex<Option<Vec<ServiceRef>>>,
}

impl<A> ExtraServiceRegistry<A> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            services: Mutex::new(Vec::new()),
            materialized: Mutex::new(None),
        }
    }

    /// Registers a background task callable.
    pub fn register_task(&self, task: ExtraTask<A>) {
        self.tasks.lock().unwrap().push(std::sync::Arc::new(task));
    }

    /// Registers an extra service entry.
    pub fn register_service(&self, service: ExtraService) {
        self.services.lock().unwrap().push(service);
    }

    /// The registered tasks, in registration order.
    pub fn tasks(&self) -> Vec<std::sync::Arc<ExtraTask<A>>> {
        self.tasks.lock().unwrap().clone()
    }

    /// Materializes the registered services bound to `parent`.
    ///
    /// Returns `None` when materialization already happened — the guard makes
    /// re-entrant activation a no-op, including across restarts.
    pub fn materialize(&self, parent: &Node) -> Option<Vec<ServiceRef>> {
        let mut guard = self.materialized.lock().unwrap();
        if guard.is_some() {
            return None;
        }
        let services: Vec<ServiceRef> = self
            .services
            .lock()
            .unwrap()
            .iter()
            .map(|entry| entry.materialize(parent))
            .collect();
        *guard = Some(services.clone());
        Some(services)
    }

    /// The materialized service instances, if materialization happened.
    pub fn materialized(&self) -> Option<Vec<ServiceRef>> {
        self.materialized.lock().unwrap().clone()
    }
}

impl<A> Default for ExtraServiceRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Node, Service};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Noop {
        node: Node,
    }

    #[async_trait]
    impl Service for Noop {
        fn node(&self) -> &Node {
            &self.node
        }
    }

    struct App;

    #[test]
    fn test_materialize_happens_exactly_once() {
        let registry: ExtraServiceRegistry<App> = ExtraServiceRegistry::new();
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        registry.register_service(ExtraService::factory(move |_node| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Noop {
                node: Node::new("extra"),
            }) as ServiceRef
        }));

        let parent = Node::new("parent");
        let first = registry.materialize(&parent);
        assert_eq!(first.map(|v| v.len()), Some(1));
        assert!(registry.materialize(&parent).is_none());
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(registry.materialized().map(|v| v.len()), Some(1));
    }

    #[test]
    fn test_instance_entries_are_used_unmodified() {
        let registry: ExtraServiceRegistry<App> = ExtraServiceRegistry::new();
        let svc: ServiceRef = Arc::new(Noop {
            node: Node::new("ready"),
        });
        registry.register_service(ExtraService::instance(svc.clone()));

        let parent = Node::new("parent");
        let out = registry.materialize(&parent).unwrap();
        assert!(std::ptr::eq(
            Arc::as_ptr(&out[0]) as *const (),
            Arc::as_ptr(&svc) as *const (),
        ));
    }

    #[tokio::test]
    async fn test_task_arity_dispatch() {
        let registry: ExtraServiceRegistry<App> = ExtraServiceRegistry::new();
        let bare = Arc::new(AtomicUsize::new(0));
        let with_app = Arc::new(AtomicUsize::new(0));

        let c = bare.clone();
        registry.register_task(ExtraTask::no_arg(move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));
        let c = with_app.clone();
        registry.register_task(ExtraTask::with_app(move |_app: Arc<App>| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        let app = Arc::new(App);
        for task in registry.tasks() {
            task.invoke(app.clone()).await.unwrap();
        }
        assert_eq!(bare.load(Ordering::SeqCst), 1);
        assert_eq!(with_app.load(Ordering::SeqCst), 1);
    }
}
