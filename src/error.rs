//! Error types used by the appvisor runtime and background tasks.
//!
//! This module defines two main error enums:
//!
//! - [`ServiceError`] — errors raised by the lifecycle machinery itself
//!   (configuration problems, dependency start failures, invalid transitions).
//! - [`TaskError`] — errors raised by background units of work attached to a
//!   running service.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics.
//!
//! A recovery-barrier wait that ends because the service was stopped
//! concurrently is **not** an error: it is reported as an early-exit event
//! ([`EventKind::RecoveryInterrupted`](crate::events::EventKind::RecoveryInterrupted)),
//! never as a `ServiceError`.

use std::time::Duration;
use thiserror::Error;

use crate::services::State;

/// # Errors produced by the lifecycle machinery.
///
/// Structural and configuration errors are local and fatal: they abort the
/// current `start()` and surface to its caller. Runtime faults in
/// independently-supervised children are *not* represented here; those are
/// isolated and reported through the event bus.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The application is misconfigured; startup is aborted and never retried.
    #[error("improperly configured: {reason}")]
    Config {
        /// What exactly is wrong with the configuration.
        reason: String,
    },

    /// A declared dependency failed to start; the parent's start is aborted.
    #[error("dependency '{service}' failed to start: {source}")]
    ChildStart {
        /// Label of the child that failed.
        service: String,
        /// The child's own failure.
        #[source]
        source: Box<ServiceError>,
    },

    /// A lifecycle operation was requested from a state that does not allow it.
    #[error("invalid lifecycle transition for '{service}': {from} -> {to}")]
    InvalidTransition {
        /// Label of the service that rejected the transition.
        service: String,
        /// State the service was in.
        from: State,
        /// State the operation tried to enter.
        to: State,
    },

    /// Graceful shutdown exceeded the configured grace period.
    #[error("shutdown grace {grace:?} exceeded; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::ServiceError;
    ///
    /// let err = ServiceError::Config { reason: "no agents".into() };
    /// assert_eq!(err.as_label(), "service_misconfigured");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Config { .. } => "service_misconfigured",
            ServiceError::ChildStart { .. } => "service_child_start_failed",
            ServiceError::InvalidTransition { .. } => "service_invalid_transition",
            ServiceError::GraceExceeded { .. } => "service_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ServiceError::Config { reason } => format!("misconfigured: {reason}"),
            ServiceError::ChildStart { service, source } => {
                format!("child '{service}' start failed: {source}")
            }
            ServiceError::InvalidTransition { service, from, to } => {
                format!("service '{service}': cannot go {from} -> {to}")
            }
            ServiceError::GraceExceeded { grace } => {
                format!("grace exceeded after {grace:?}")
            }
        }
    }

    /// Returns the label of the deepest failed dependency, if this error came
    /// out of a child start chain.
    pub fn origin(&self) -> Option<&str> {
        match self {
            ServiceError::ChildStart { service, source } => {
                Some(source.origin().unwrap_or(service))
            }
            _ => None,
        }
    }
}

/// # Errors produced by background units of work.
///
/// Background tasks and runtime-attached services run in an isolated fault
/// domain: a failure is published to the supervision bus but never forces the
/// owning service to stop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Background task failed.
    #[error("background task failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Background task observed cancellation and exited cooperatively.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "context cancelled".to_string(),
        }
    }
}
