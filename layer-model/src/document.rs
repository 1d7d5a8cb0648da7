//! The document model: a mutable node tree with selection and session data.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::ModelError;
use crate::events::{DocumentEvent, ListenerRegistry, Subscription};
use crate::node::{NodeArena, NodeData, NodeId, NodeSpec, PropertyValue};
use crate::path::{NodePath, TreeRead, path_of};
use crate::session::SessionData;

/// Property name that carries a node's identifier.
pub const ID_PROPERTY: &str = "id";

#[derive(Debug, Default)]
pub(crate) struct DocumentInner {
    pub arena: NodeArena,
    pub root: Option<NodeId>,
    pub selection: Vec<NodeId>,
    /// The tree replaced by the last root swap, kept for path lookups.
    pub retired: NodeArena,
}

/// A document: node tree, selection list, listeners and session bag.
///
/// `Document` is a cheap-to-clone handle; clones share the same tree.
/// Every mutation emits [`DocumentEvent`]s to subscribed listeners after the
/// internal lock has been released, so listeners may read the document.
///
/// # Example
///
/// ```
/// use layer_model::{Document, NodeSpec, TreeRead};
///
/// let doc = Document::with_root(NodeSpec::container().child(NodeSpec::leaf()));
/// let root = doc.root().unwrap();
/// let added = doc.add_node(root, 0, NodeSpec::container()).unwrap();
/// assert_eq!(doc.children(root)[0], added);
/// assert_eq!(doc.depth(added), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Document {
    inner: Arc<RwLock<DocumentInner>>,
    listeners: Arc<ListenerRegistry>,
    session: SessionData,
}

impl Document {
    /// Create an empty document with no root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document whose tree is built from `spec`.
    pub fn with_root(spec: NodeSpec) -> Self {
        let doc = Self::new();
        {
            let mut guard = doc.write();
            let root = guard.arena.build(spec, None);
            guard.root = Some(root);
        }
        doc
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, DocumentInner> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, DocumentInner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn emit_all(&self, events: Vec<DocumentEvent>) {
        for event in &events {
            self.listeners.emit(event);
        }
    }

    /// Whether two handles refer to the same document.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// The current root node.
    pub fn root(&self) -> Option<NodeId> {
        self.read().root
    }

    /// The document's authoritative selection, in selection order.
    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.read().selection.clone()
    }

    /// Identifier of a node.
    pub fn identifier(&self, id: NodeId) -> Option<String> {
        self.read().arena.get(id).and_then(|n| n.identifier.clone())
    }

    /// Current value of a property.
    pub fn property(&self, id: NodeId, name: &str) -> Option<PropertyValue> {
        self.read()
            .arena
            .get(id)
            .and_then(|n| n.properties.get(name).cloned())
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.read().arena.len()
    }

    /// Find the first node (depth-first, pre-order) with this identifier.
    pub fn find_by_identifier(&self, identifier: &str) -> Option<NodeId> {
        let guard = self.read();
        let mut stack: Vec<NodeId> = guard.root.into_iter().collect();
        while let Some(current) = stack.pop() {
            let data = guard.arena.get(current)?;
            if data.identifier.as_deref() == Some(identifier) {
                return Some(current);
            }
            stack.extend(data.children.iter().rev().copied());
        }
        None
    }

    /// Path a node had in the tree that the last [`set_root`](Self::set_root)
    /// or [`clear`](Self::clear) replaced.
    pub fn former_path(&self, id: NodeId) -> Option<NodePath> {
        path_of(&self.read().retired, id)
    }

    /// The session bag attached to this document.
    pub fn session(&self) -> SessionData {
        self.session.clone()
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Register a listener for every subsequent event.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&DocumentEvent) + Send + Sync + 'static,
    {
        let id = self.listeners.add(Arc::new(listener));
        Subscription::new(id, &self.listeners)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Replace the whole tree. Every previous node id becomes stale and the
    /// selection is cleared.
    pub fn set_root(&self, spec: NodeSpec) -> NodeId {
        let root = {
            let mut guard = self.write();
            guard.retired = std::mem::take(&mut guard.arena);
            guard.selection.clear();
            let root = guard.arena.build(spec, None);
            guard.root = Some(root);
            root
        };
        log::debug!("root replaced by {root}");
        self.emit_all(vec![DocumentEvent::RootChanged { root: Some(root) }]);
        root
    }

    /// Drop the tree entirely.
    pub fn clear(&self) {
        {
            let mut guard = self.write();
            guard.retired = std::mem::take(&mut guard.arena);
            guard.selection.clear();
            guard.root = None;
        }
        self.emit_all(vec![DocumentEvent::RootChanged { root: None }]);
    }

    /// Insert a subtree under `parent` at `index` (clamped to the child count).
    pub fn add_node(&self, parent: NodeId, index: usize, spec: NodeSpec) -> Result<NodeId, ModelError> {
        let node = {
            let mut guard = self.write();
            let data = guard.arena.get(parent).ok_or(ModelError::UnknownNode(parent))?;
            if !data.container {
                return Err(ModelError::NotAContainer(parent));
            }
            let node = guard.arena.build(spec, None);
            guard.arena.attach(node, parent, index);
            node
        };
        self.emit_all(vec![DocumentEvent::NodeAdded { node, parent }]);
        Ok(node)
    }

    /// Remove a node and its subtree. Removed nodes leave the selection.
    pub fn remove_node(&self, id: NodeId) -> Result<(), ModelError> {
        let mut events = Vec::new();
        {
            let mut guard = self.write();
            if !guard.arena.contains(id) {
                return Err(ModelError::UnknownNode(id));
            }
            let (parent, _) = guard.arena.detach(id).ok_or(ModelError::RootNotRemovable)?;
            let removed: HashSet<NodeId> = guard.arena.drop_subtree(id).into_iter().collect();
            events.push(DocumentEvent::NodeRemoved { node: id, parent });
            let before = guard.selection.len();
            guard.selection.retain(|n| !removed.contains(n));
            if guard.selection.len() != before {
                events.push(DocumentEvent::SelectionChanged);
            }
        }
        self.emit_all(events);
        Ok(())
    }

    /// Move an existing non-root node under `parent` at `index`.
    pub fn move_node(&self, id: NodeId, parent: NodeId, index: usize) -> Result<(), ModelError> {
        let events = {
            let mut guard = self.write();
            let mut events = Vec::new();
            Self::move_locked(&mut guard, id, parent, index, &mut events)?;
            events
        };
        self.emit_all(events);
        Ok(())
    }

    pub(crate) fn move_locked(
        guard: &mut DocumentInner,
        id: NodeId,
        parent: NodeId,
        index: usize,
        events: &mut Vec<DocumentEvent>,
    ) -> Result<(), ModelError> {
        if !guard.arena.contains(id) {
            return Err(ModelError::UnknownNode(id));
        }
        let target = guard.arena.get(parent).ok_or(ModelError::UnknownNode(parent))?;
        if !target.container {
            return Err(ModelError::NotAContainer(parent));
        }
        // A node cannot move into its own subtree.
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == id {
                return Err(ModelError::InvalidSelection(format!(
                    "cannot move {id} into its own subtree"
                )));
            }
            cursor = guard.arena.get(current).and_then(|n| n.parent);
        }
        let (old_parent, _) = guard.arena.detach(id).ok_or(ModelError::RootNotRemovable)?;
        events.push(DocumentEvent::NodeRemoved {
            node: id,
            parent: old_parent,
        });
        guard.arena.attach(id, parent, index);
        events.push(DocumentEvent::NodeAdded { node: id, parent });
        Ok(())
    }

    /// Change a property. Setting [`ID_PROPERTY`] to text updates the identifier.
    pub fn set_property(
        &self,
        id: NodeId,
        name: impl Into<String>,
        value: PropertyValue,
    ) -> Result<(), ModelError> {
        let property = name.into();
        {
            let mut guard = self.write();
            let data = guard.arena.get_mut(id).ok_or(ModelError::UnknownNode(id))?;
            if property == ID_PROPERTY
                && let PropertyValue::Text(text) = &value
            {
                data.identifier = Some(text.clone());
            }
            data.properties.insert(property.clone(), value.clone());
        }
        self.emit_all(vec![DocumentEvent::TreeChanged {
            node: id,
            property,
            value: Some(value),
        }]);
        Ok(())
    }

    /// Replace the selection. Unknown ids are ignored, duplicates collapse.
    pub fn select(&self, ids: &[NodeId]) {
        {
            let mut guard = self.write();
            let mut seen = HashSet::new();
            let selection: Vec<NodeId> = ids
                .iter()
                .copied()
                .filter(|id| guard.arena.contains(*id) && seen.insert(*id))
                .collect();
            guard.selection = selection;
        }
        self.emit_all(vec![DocumentEvent::SelectionChanged]);
    }

    /// Clear the selection.
    pub fn clear_selection(&self) {
        self.select(&[]);
    }
}

impl DocumentInner {
    /// Live node, or one retired by the last root swap.
    fn readable(&self, id: NodeId) -> Option<&NodeData> {
        self.arena.get(id).or_else(|| self.retired.get(id))
    }
}

/// Structure reads also see nodes retired by the last root swap, so a view
/// still holding them can walk the tree it was showing. [`contains`] only
/// reports live nodes.
///
/// [`contains`]: TreeRead::contains
impl TreeRead for Document {
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.read().readable(id).and_then(|n| n.parent)
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.read()
            .readable(id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn is_container(&self, id: NodeId) -> bool {
        self.read().readable(id).map(|n| n.container).unwrap_or(false)
    }

    fn contains(&self, id: NodeId) -> bool {
        self.read().arena.contains(id)
    }

    fn depth(&self, id: NodeId) -> usize {
        let guard = self.read();
        let mut depth = 0;
        let mut current = guard.readable(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            depth += 1;
            current = guard.readable(parent).and_then(|n| n.parent);
        }
        depth
    }
}
