//! # Global runtime configuration.
//!
//! [`Config`] defines orchestrator-wide behavior: diagnostics bus capacity,
//! the shutdown grace period enforced by the [`Worker`](crate::app::Worker),
//! and the optional per-child stop deadline.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use appvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.grace = Duration::from_secs(10);
//! cfg.stop_grace = Some(Duration::from_secs(5));
//!
//! assert_eq!(cfg.bus_capacity, 1024);
//! ```

use std::time::Duration;

/// Global configuration for the orchestrator runtime.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the diagnostics event bus channel.
    pub bus_capacity: usize,
    /// Maximum time the worker waits for graceful shutdown before giving up.
    pub grace: Duration,
    /// Optional deadline for a single child's `stop()`.
    ///
    /// `None` awaits each child indefinitely. When set, an overdue child stop
    /// is abandoned after publishing
    /// [`EventKind::StopGraceExceeded`](crate::events::EventKind::StopGraceExceeded)
    /// and teardown continues with the next child.
    pub stop_grace: Option<Duration>,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    /// - `stop_grace = None` (wait indefinitely)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
            stop_grace: None,
        }
    }
}

impl Config {
    /// Returns the bus capacity clamped to a minimum of 1.
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}
