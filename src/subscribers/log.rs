//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! Enabled via the `logging` feature; primarily useful for development.
//!
//! ## Output format
//! ```text
//! [starting] service=app
//! [started] service=app
//! [crashed] service=producer reason="connection refused"
//! [attached] service=app child=user-metrics
//! [future-failed] service=app reason="tick overflow"
//! [recovery-interrupted] service=app
//! [shutdown-requested]
//! ```
//!
//! Not intended for production use: implement a custom
//! [`Subscriber`](crate::Subscriber) for structured logging or metrics.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscriber;

/// Simple stdout logging subscriber.
pub struct LogWriter;

impl LogWriter {
    fn field(opt: &Option<std::sync::Arc<str>>) -> &str {
        opt.as_deref().unwrap_or("?")
    }
}

#[async_trait]
impl Subscriber for LogWriter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn handle(&self, e: &Event) {
        match e.kind {
            EventKind::ServiceStarting => {
                println!("[starting] service={}", Self::field(&e.service));
            }
            EventKind::ServiceStarted => {
                println!("[started] service={}", Self::field(&e.service));
            }
            EventKind::ServiceStopping => {
                println!("[stopping] service={}", Self::field(&e.service));
            }
            EventKind::ServiceStopped => {
                println!("[stopped] service={}", Self::field(&e.service));
            }
            EventKind::ServiceRestarting => {
                println!("[restarting] service={}", Self::field(&e.service));
            }
            EventKind::ServiceCrashed => {
                println!(
                    "[crashed] service={} reason={:?}",
                    Self::field(&e.service),
                    e.reason
                );
            }
            EventKind::DependencyAttached => {
                println!(
                    "[attached] service={} child={}",
                    Self::field(&e.service),
                    Self::field(&e.child)
                );
            }
            EventKind::FutureFailed => {
                println!(
                    "[future-failed] service={} reason={:?}",
                    Self::field(&e.service),
                    e.reason
                );
            }
            EventKind::RecoveryInterrupted => {
                println!("[recovery-interrupted] service={}", Self::field(&e.service));
            }
            EventKind::StartupFinished => {
                println!("[startup-finished] service={}", Self::field(&e.service));
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::StopGraceExceeded => {
                println!(
                    "[stop-grace-exceeded] service={} child={}",
                    Self::field(&e.service),
                    Self::field(&e.child)
                );
            }
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
                eprintln!(
                    "[subscriber] name={} reason={:?}",
                    Self::field(&e.service),
                    e.reason
                );
            }
        }
    }
}
