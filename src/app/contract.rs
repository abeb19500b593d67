//! # Application capability contract.
//!
//! The orchestrator never owns the subsystems it coordinates; it consumes
//! them through [`Application`], a read-mostly contract the surrounding
//! application object satisfies. Every collaborator is a plain
//! [`ServiceRef`] — the dependency graph treats producer, consumer, sensors,
//! and agents polymorphically over the one lifecycle capability, never
//! through type-specific branching.
//!
//! The scheduling substrate is the ambient tokio runtime; per-tree affinity
//! is carried by the [`Node`](crate::Node) context-token hierarchy, so the
//! contract has no scheduler accessor.
//!
//! Structural mutation of the application's collections (sensors, agents,
//! extra tasks) is allowed only before `finalize()` seals the configuration.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::services::{Flag, Service, ServiceRef};

/// # The table-management collaborator.
///
/// Owns the recovery barrier the orchestrator observes (and never sets) to
/// gate "fully started".
pub trait TableManager: Service {
    /// Becomes set once state recovery completes.
    fn recovery_completed(&self) -> Flag;
}

/// # Ordered sensor collection with identity dedup.
///
/// Registration compares data pointers, so registering the same instance
/// twice — e.g. the built-in monitor on every start, or a user pre-seeding
/// their own monitor — keeps exactly one entry and preserves first-seen
/// order.
#[derive(Default)]
pub struct SensorSet {
    inner: Mutex<Vec<ServiceRef>>,
}

impl SensorSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `sensor` unless the same instance is already present.
    pub fn register(&self, sensor: ServiceRef) {
        let mut sensors = self.inner.lock().unwrap();
        let present = sensors.iter().any(|s| same_instance(s, &sensor));
        if !present {
            sensors.push(sensor);
        }
    }

    /// Whether the exact instance is in the set.
    pub fn contains(&self, sensor: &ServiceRef) -> bool {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .any(|s| same_instance(s, sensor))
    }

    /// The sensors in registration order.
    pub fn snapshot(&self) -> Vec<ServiceRef> {
        self.inner.lock().unwrap().clone()
    }

    /// Number of registered sensors.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// True when no sensor is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

/// Identity comparison over the data pointers of two service handles.
fn same_instance(a: &ServiceRef, b: &ServiceRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// # Capability contract of the surrounding application object.
///
/// Collaborator accessors return shared handles; the orchestrator computes
/// its dependency graph from them once per start and drives everything
/// through the uniform [`Service`] contract. Hooks mirror the orchestrator's
/// own lifecycle and are delegated at the documented points.
#[async_trait]
pub trait Application: Send + Sync + 'static {
    /// Human-readable application label.
    fn label(&self) -> &str;

    /// Compact label for dense logs.
    fn short_label(&self) -> &str {
        self.label()
    }

    /// Reduced topology: enough to publish requests and receive replies,
    /// without the server-side processing graph.
    fn client_only(&self) -> bool;

    /// The built-in monitoring sensor. Guaranteed present in [`sensors`]
    /// after a server-mode start, exactly once.
    ///
    /// [`sensors`]: Application::sensors
    fn monitor(&self) -> ServiceRef;

    /// User-registered sensors. Sensors start first and stop last.
    fn sensors(&self) -> &SensorSet;

    /// Registered agents, in registration order. At least one must be
    /// registered before the first start, in either mode.
    fn agents(&self) -> Vec<ServiceRef>;

    /// Network producer. Always stops after the consumer.
    fn producer(&self) -> ServiceRef;

    /// Network consumer.
    fn consumer(&self) -> ServiceRef;

    /// Reply-side consumer; depends on the base producer/consumer pair.
    fn reply_consumer(&self) -> ServiceRef;

    /// Leader assignor; server mode only.
    fn leader_assignor(&self) -> ServiceRef;

    /// Topic router.
    fn topic_router(&self) -> ServiceRef;

    /// Table manager; owns the recovery barrier.
    fn table_manager(&self) -> Arc<dyn TableManager>;

    /// Fetcher; depends on topic routing.
    fn fetcher(&self) -> ServiceRef;

    /// Creates required on-disk directories. Called exactly once, on the
    /// very first start.
    fn create_directories(&self) -> Result<(), ServiceError>;

    /// Seals the configuration; no structural mutation is allowed afterwards.
    /// Called on every start, before the application's own start hook.
    fn finalize(&self) -> Result<(), ServiceError>;

    /// Delegated once, on the very first start.
    async fn on_first_start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Delegated on every start, including restarts.
    async fn on_start(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Delegated after the application is fully started and extra
    /// tasks/services are live.
    async fn on_started(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Delegated on stop, before the children stop. Best effort.
    async fn on_stop(&self) {}

    /// Delegated on final shutdown. Best effort.
    async fn on_shutdown(&self) {}

    /// Delegated on restart. Best effort.
    async fn on_restart(&self) {}

    /// Invoked exactly once per start, right after extra tasks/services are
    /// live — the "worker ready" signal.
    async fn on_startup_finished(&self) {}
}
