//! # Worker: drives an application until an OS signal or natural exit.
//!
//! The [`Worker`] is the process-level entry point: it starts the proxy's
//! orchestrator, then waits for either a termination signal or the
//! orchestrator stopping on its own. On a signal it publishes
//! [`EventKind::ShutdownRequested`] and runs a graceful stop bounded by the
//! configured grace period.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::app::{Application, ServiceProxy};
use crate::config::Config;
use crate::error::ServiceError;
use crate::events::{Event, EventKind};
use crate::services::{Service, ServiceExt};

/// Process-level driver for an application's orchestrator.
pub struct Worker<A: Application> {
    proxy: Arc<ServiceProxy<A>>,
    grace: Duration,
}

impl<A: Application> Worker<A> {
    /// Creates a worker over `proxy` with the shutdown grace from `cfg`.
    pub fn new(proxy: Arc<ServiceProxy<A>>, cfg: &Config) -> Self {
        Self {
            proxy,
            grace: cfg.grace,
        }
    }

    /// The proxy this worker drives.
    pub fn proxy(&self) -> &Arc<ServiceProxy<A>> {
        &self.proxy
    }

    /// Starts the application and runs until a termination signal or until
    /// the orchestrator stops on its own.
    ///
    /// On a signal the stop is bounded by the grace period; exceeding it
    /// returns [`ServiceError::GraceExceeded`] with children possibly still
    /// tearing down in the background.
    pub async fn execute(&self) -> Result<(), ServiceError> {
        self.proxy.start().await?;
        let svc = self.proxy.service();

        tokio::select! {
            res = wait_for_shutdown_signal() => {
                let mut ev = Event::now(EventKind::ShutdownRequested)
                    .with_service(svc.node().label_arc());
                if let Err(err) = res {
                    ev = ev.with_reason(err.to_string());
                }
                svc.node().publish(ev);
                self.shutdown().await
            }
            _ = svc.wait_until_stopped() => Ok(()),
        }
    }

    /// Runs a graceful stop bounded by the grace period.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        match time::timeout(self.grace, self.proxy.stop()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(ServiceError::GraceExceeded { grace: self.grace }),
        }
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
