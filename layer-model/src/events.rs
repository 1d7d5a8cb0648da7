//! Document change events and listener subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::node::{NodeId, PropertyValue};

/// A change notification emitted by a [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    /// A node (and its subtree) was inserted under `parent`.
    NodeAdded { node: NodeId, parent: NodeId },
    /// A node (and its subtree) was removed from `parent`.
    NodeRemoved { node: NodeId, parent: NodeId },
    /// The whole tree was replaced. Every previous node id is stale.
    RootChanged { root: Option<NodeId> },
    /// A property of `node` changed.
    TreeChanged {
        node: NodeId,
        property: String,
        value: Option<PropertyValue>,
    },
    /// The document's selection list changed.
    SelectionChanged,
}

impl DocumentEvent {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NodeAdded { .. } => "node-added",
            Self::NodeRemoved { .. } => "node-removed",
            Self::RootChanged { .. } => "root-changed",
            Self::TreeChanged { .. } => "tree-changed",
            Self::SelectionChanged => "selection-changed",
        }
    }
}

pub(crate) type Listener = Arc<dyn Fn(&DocumentEvent) + Send + Sync>;

/// Registered listeners of one document.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(u64, Listener)>>,
}

impl ListenerRegistry {
    pub fn add(&self, listener: Listener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut guard = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.push((id, listener));
        id
    }

    pub fn remove(&self, id: u64) {
        let mut guard = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.retain(|(existing, _)| *existing != id);
    }

    pub fn len(&self) -> usize {
        self.listeners.read().map(|g| g.len()).unwrap_or(0)
    }

    /// Invoke every listener. The list is cloned first so listeners may
    /// subscribe or unsubscribe while being notified.
    pub fn emit(&self, event: &DocumentEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .map(|g| g.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        log::trace!("emit {} to {} listener(s)", event.name(), listeners.len());
        for listener in listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish_non_exhaustive()
    }
}

/// Handle for a registered listener. Dropping it unsubscribes.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub(crate) fn new(id: u64, registry: &Arc<ListenerRegistry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    /// Unsubscribe now. Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        self.registry = Weak::new();
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.registry.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}
