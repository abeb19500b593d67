//! # Lifecycle states.
//!
//! [`State`] models one run of a service:
//!
//! ```text
//! Init ──► Starting ──► Started ──► Stopping ──► Stopped
//!              │            │                       │
//!              └── Crashed ◄┘                       ▼
//!                     │                        Restarting ──► Starting
//!                     └──────────────────────────►┘
//! ```
//!
//! Transitions are monotonic within a single run. `Crashed` is reachable from
//! any running state. `Restarting` re-enters `Starting` after `Stopped` or
//! `Crashed`; one-time hooks are suppressed by the node's persistent
//! first-start flag, not by the state machine.

use std::fmt;

/// Lifecycle state of a service for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Constructed, never started.
    Init,
    /// `start()` in progress: children starting, hooks running.
    Starting,
    /// Self and every declared child are live.
    Started,
    /// `stop()` in progress: hooks and children tearing down.
    Stopping,
    /// Fully stopped; may re-enter `Starting` via restart.
    Stopped,
    /// A hook or a dependency failed while the service was running.
    Crashed,
    /// Between a stop and the next start of a restart cycle.
    Restarting,
}

impl State {
    /// States from which `start()` may enter `Starting`.
    pub fn can_enter_starting(self) -> bool {
        matches!(
            self,
            State::Init | State::Stopped | State::Crashed | State::Restarting
        )
    }

    /// States from which `stop()` proceeds; everything else is a no-op.
    pub fn can_enter_stopping(self) -> bool {
        matches!(self, State::Starting | State::Started | State::Crashed)
    }

    /// True once the service has finished for good (or was never started).
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Stopped | State::Crashed)
    }

    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            State::Init => "init",
            State::Starting => "starting",
            State::Started => "started",
            State::Stopping => "stopping",
            State::Stopped => "stopped",
            State::Crashed => "crashed",
            State::Restarting => "restarting",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
