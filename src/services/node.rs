//! # Node: the lifecycle state carried by every service.
//!
//! A [`Node`] bundles everything the generic lifecycle algorithms need:
//!
//! - the [`State`] machine, observable through a `watch` channel;
//! - the [`Beacon`] supervision link;
//! - the scheduling-context binding: a [`CancellationToken`] that is a child
//!   of the parent's token once the node is attached to a tree. Rebinding a
//!   node's context means re-parenting its token and adopting the parent's
//!   diagnostics bus, so a whole tree cancels and reports together;
//! - the persistent first-start flag (survives restarts; this is what makes
//!   one-time hooks one-time);
//! - the declared children (the dependency graph, fixed when `Starting`
//!   begins) and the runtime-attached children (LIFO teardown);
//! - tracked background futures, cancelled when the node stops.
//!
//! ## Rules
//! - All mutation happens behind short-lived `std::sync::Mutex` guards; no
//!   guard is ever held across an await point.
//! - The context token is refreshed on re-entry to `Starting` only if the
//!   previous run cancelled it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event};
use crate::services::{Beacon, ServiceRef, State};

/// Default diagnostics bus capacity for detached nodes.
const DETACHED_BUS_CAPACITY: usize = 256;

/// Per-service lifecycle state.
pub struct Node {
    label: Arc<str>,
    beacon: Beacon,
    bus: Mutex<Bus>,
    state: watch::Sender<State>,
    context: Mutex<CancellationToken>,
    parent_context: Mutex<Option<CancellationToken>>,
    first_start_done: AtomicBool,
    children: Mutex<Vec<ServiceRef>>,
    runtime_children: Mutex<Vec<ServiceRef>>,
    futures: Mutex<Vec<JoinHandle<()>>>,
    stop_grace: Option<Duration>,
}

impl Node {
    /// Creates a detached node with its own small diagnostics bus.
    ///
    /// The node adopts its parent's bus when attached to a tree.
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self::with_bus(label, Bus::new(DETACHED_BUS_CAPACITY))
    }

    /// Creates a node publishing to the given bus.
    pub fn with_bus(label: impl Into<Arc<str>>, bus: Bus) -> Self {
        let label = label.into();
        let (state, _rx) = watch::channel(State::Init);
        Self {
            beacon: Beacon::new(label.clone()),
            label,
            bus: Mutex::new(bus),
            state,
            context: Mutex::new(CancellationToken::new()),
            parent_context: Mutex::new(None),
            first_start_done: AtomicBool::new(false),
            children: Mutex::new(Vec::new()),
            runtime_children: Mutex::new(Vec::new()),
            futures: Mutex::new(Vec::new()),
            stop_grace: None,
        }
    }

    /// Sets a deadline for each child's `stop()` driven by this node.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = Some(grace);
        self
    }

    // ---- identity & wiring ----

    /// The node's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The node's label as a shared string (for event metadata).
    pub fn label_arc(&self) -> Arc<str> {
        self.label.clone()
    }

    /// The node's supervision link.
    pub fn beacon(&self) -> &Beacon {
        &self.beacon
    }

    /// The diagnostics bus this node currently publishes to.
    pub fn bus(&self) -> Bus {
        self.bus.lock().unwrap().clone()
    }

    /// Publishes a diagnostics event.
    pub fn publish(&self, ev: Event) {
        self.bus().publish(ev);
    }

    /// The current cancellation token of this node's run.
    pub fn token(&self) -> CancellationToken {
        self.context.lock().unwrap().clone()
    }

    /// Re-parents this node's scheduling context under `parent`:
    /// the token becomes a child of the parent's token and the node adopts
    /// the parent's bus. Call before starting the node, never while it runs.
    pub fn rebind_context(&self, parent: &Node) {
        let parent_token = parent.token();
        *self.context.lock().unwrap() = parent_token.child_token();
        *self.parent_context.lock().unwrap() = Some(parent_token);
        *self.bus.lock().unwrap() = parent.bus();
    }

    /// Configured per-child stop deadline, if any.
    pub fn stop_grace(&self) -> Option<Duration> {
        self.stop_grace
    }

    // ---- state machine ----

    /// The current lifecycle state.
    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    /// Subscribes to state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Waits until the state satisfies `pred` (checks the current state first).
    pub async fn wait_for_state(&self, pred: impl Fn(State) -> bool) {
        let mut rx = self.state.subscribe();
        // The sender lives in self, so the channel cannot close while we wait.
        let _ = rx.wait_for(|s| pred(*s)).await;
    }

    /// Attempts the transition into `Starting`.
    ///
    /// On success the context token is refreshed when the previous run left it
    /// cancelled. On failure returns the state that rejected the transition.
    pub(crate) fn enter_starting(&self) -> Result<(), State> {
        let mut rejected = None;
        let changed = self.state.send_if_modified(|s| {
            if s.can_enter_starting() {
                *s = State::Starting;
                true
            } else {
                rejected = Some(*s);
                false
            }
        });
        if !changed {
            return Err(rejected.unwrap_or(State::Init));
        }

        let mut ctx = self.context.lock().unwrap();
        if ctx.is_cancelled() {
            *ctx = match &*self.parent_context.lock().unwrap() {
                Some(parent) => parent.child_token(),
                None => CancellationToken::new(),
            };
        }
        Ok(())
    }

    /// Attempts the transition into `Stopping`; `false` means stop is a no-op
    /// from the current state.
    pub(crate) fn enter_stopping(&self) -> bool {
        self.state.send_if_modified(|s| {
            if s.can_enter_stopping() {
                *s = State::Stopping;
                true
            } else {
                false
            }
        })
    }

    /// Attempts the transition into `Started`.
    ///
    /// Only succeeds from `Starting`; `false` means a concurrent stop won the
    /// race and the teardown owns the state now.
    pub(crate) fn try_set_started(&self) -> bool {
        self.state.send_if_modified(|s| {
            if *s == State::Starting {
                *s = State::Started;
                true
            } else {
                false
            }
        })
    }

    /// Records that the one-time first-start hook has run.
    pub(crate) fn mark_first_start(&self) {
        self.first_start_done.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_stopped(&self) {
        self.state.send_replace(State::Stopped);
    }

    pub(crate) fn set_restarting(&self) {
        self.state.send_replace(State::Restarting);
    }

    /// Marks the node crashed and cancels its context.
    pub(crate) fn crash(&self) {
        self.state.send_replace(State::Crashed);
        self.context.lock().unwrap().cancel();
    }

    /// Cancels the context token, interrupting barrier waits and background
    /// futures bound to this run.
    pub(crate) fn cancel_context(&self) {
        self.context.lock().unwrap().cancel();
    }

    /// Whether this node has ever completed a start.
    pub fn first_start_completed(&self) -> bool {
        self.first_start_done.load(Ordering::SeqCst)
    }

    // ---- dependency graph ----

    /// Fixes the declared dependency graph for this run.
    pub(crate) fn set_children(&self, children: Vec<ServiceRef>) {
        *self.children.lock().unwrap() = children;
    }

    /// The declared children, in start order.
    pub fn children(&self) -> Vec<ServiceRef> {
        self.children.lock().unwrap().clone()
    }

    /// Appends a runtime-attached child.
    pub(crate) fn push_runtime_child(&self, child: ServiceRef) {
        self.runtime_children.lock().unwrap().push(child);
    }

    /// The runtime-attached children, in attachment order.
    pub fn runtime_children(&self) -> Vec<ServiceRef> {
        self.runtime_children.lock().unwrap().clone()
    }

    /// Removes and returns the runtime-attached children.
    pub(crate) fn drain_runtime_children(&self) -> Vec<ServiceRef> {
        std::mem::take(&mut *self.runtime_children.lock().unwrap())
    }

    // ---- tracked background futures ----

    /// Tracks a spawned background activity of this node's run.
    pub(crate) fn track(&self, handle: JoinHandle<()>) {
        self.futures.lock().unwrap().push(handle);
    }

    /// Removes and returns the tracked background handles.
    pub(crate) fn take_futures(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *self.futures.lock().unwrap())
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("label", &self.label)
            .field("state", &self.state())
            .finish()
    }
}
