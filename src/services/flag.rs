//! # One-shot awaitable condition.
//!
//! [`Flag`] is a small wrapper over [`tokio::sync::watch`]: it starts unset,
//! can be set exactly once (further sets are no-ops), and any number of tasks
//! can await it. The recovery barrier owned by the table-management subsystem
//! is a `Flag`: the orchestrator observes it, never sets it.
//!
//! ## Example
//! ```rust
//! use appvisor::Flag;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let flag = Flag::new();
//! let observer = flag.clone();
//!
//! let waiter = tokio::spawn(async move { observer.wait().await });
//! flag.set();
//! waiter.await.unwrap();
//! assert!(flag.is_set());
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::watch;

/// Awaitable one-shot condition. Clones observe the same underlying state.
#[derive(Clone, Debug)]
pub struct Flag {
    tx: Arc<watch::Sender<bool>>,
}

impl Flag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Sets the flag, waking all waiters. Idempotent.
    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    /// Returns whether the flag has been set.
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the flag is set. Returns immediately if already set.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender is held by self, so wait_for cannot observe a closed channel.
        let _ = rx.wait_for(|set| *set).await;
    }
}

impl Default for Flag {
    fn default() -> Self {
        Self::new()
    }
}
