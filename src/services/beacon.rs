//! # Supervision link ("beacon").
//!
//! Every node carries a [`Beacon`]: a label plus an optional, reattachable
//! link to its parent's beacon. The beacon exists for failure visibility and
//! diagnostics — it renders the node's position in the supervision tree as a
//! path — and implies no ownership: dropping a parent never tears a child
//! down through the beacon.
//!
//! A node has at most one parent; `reattach` replaces the previous link.

use std::sync::{Arc, Mutex};

struct BeaconInner {
    label: Arc<str>,
    parent: Mutex<Option<Beacon>>,
}

/// Reattachable link into the supervision tree.
#[derive(Clone)]
pub struct Beacon {
    inner: Arc<BeaconInner>,
}

impl Beacon {
    /// Creates a detached beacon with the given label.
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self {
            inner: Arc::new(BeaconInner {
                label: label.into(),
                parent: Mutex::new(None),
            }),
        }
    }

    /// Label of the node this beacon belongs to.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Re-parents this beacon under `parent`, replacing any previous link.
    pub fn reattach(&self, parent: &Beacon) {
        let mut slot = self.inner.parent.lock().unwrap();
        *slot = Some(parent.clone());
    }

    /// Returns the current parent link, if attached.
    pub fn parent(&self) -> Option<Beacon> {
        self.inner.parent.lock().unwrap().clone()
    }

    /// Renders the root-to-node diagnostic path, e.g. `app/tables/recovery`.
    pub fn path(&self) -> String {
        let mut labels = vec![self.inner.label.to_string()];
        let mut cursor = self.parent();
        // Defends against accidental reattach cycles.
        let mut hops = 0;
        while let Some(parent) = cursor {
            if hops > 64 {
                break;
            }
            labels.push(parent.label().to_string());
            cursor = parent.parent();
            hops += 1;
        }
        labels.reverse();
        labels.join("/")
    }
}

impl std::fmt::Debug for Beacon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Beacon").field("path", &self.path()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_walks_to_root() {
        let root = Beacon::new("app");
        let mid = Beacon::new("tables");
        let leaf = Beacon::new("recovery");
        mid.reattach(&root);
        leaf.reattach(&mid);
        assert_eq!(leaf.path(), "app/tables/recovery");
    }

    #[test]
    fn test_reattach_replaces_parent() {
        let first = Beacon::new("first");
        let second = Beacon::new("second");
        let child = Beacon::new("child");
        child.reattach(&first);
        child.reattach(&second);
        assert_eq!(child.path(), "second/child");
    }
}
