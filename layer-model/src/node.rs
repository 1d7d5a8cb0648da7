//! Node identifiers, node construction specs and the node arena.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier for a node in a [`Document`](crate::Document).
///
/// Ids are never reused. Once a node is removed (or its whole tree is
/// replaced by a new root) the id simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Value carried by a property change.
///
/// A value may itself be a tree node, which is what makes a property change
/// structurally relevant to a layer view.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Node(NodeId),
    Text(String),
    Number(f64),
    Bool(bool),
}

impl PropertyValue {
    /// Returns the node if this value refers to one.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }
}

/// Description of a subtree to insert into a document.
///
/// # Example
///
/// ```
/// use layer_model::NodeSpec;
///
/// let spec = NodeSpec::container()
///     .with_id("panel")
///     .child(NodeSpec::leaf().with_id("title"))
///     .child(NodeSpec::container().child(NodeSpec::leaf()));
/// assert_eq!(spec.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    pub identifier: Option<String>,
    pub container: bool,
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    /// A node that cannot hold children.
    pub fn leaf() -> Self {
        Self::default()
    }

    /// A node with the container capability.
    pub fn container() -> Self {
        Self {
            container: true,
            ..Self::default()
        }
    }

    /// Set the identifier.
    pub fn with_id(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Append a child. Appending to a leaf turns it into a container.
    pub fn child(mut self, child: NodeSpec) -> Self {
        self.container = true;
        self.children.push(child);
        self
    }

    /// Append several children.
    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.container = true;
        self.children.extend(children);
        self
    }

    /// Number of nodes in this subtree, including this one.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(NodeSpec::len).sum::<usize>()
    }

    /// Always false; a spec describes at least one node.
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub container: bool,
    pub identifier: Option<String>,
    pub properties: HashMap<String, PropertyValue>,
}

/// Flat storage for every live node of a document.
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    nodes: HashMap<NodeId, NodeData>,
}

impl NodeArena {
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Materialise a spec under `parent`, returning the new subtree root.
    pub fn build(&mut self, spec: NodeSpec, parent: Option<NodeId>) -> NodeId {
        let id = NodeId::next();
        self.nodes.insert(
            id,
            NodeData {
                parent,
                children: Vec::with_capacity(spec.children.len()),
                container: spec.container,
                identifier: spec.identifier,
                properties: HashMap::new(),
            },
        );
        let children: Vec<NodeId> = spec
            .children
            .into_iter()
            .map(|child| self.build(child, Some(id)))
            .collect();
        if let Some(data) = self.nodes.get_mut(&id) {
            data.children = children;
        }
        id
    }

    /// Drop a node and all of its descendants, returning every removed id.
    pub fn drop_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(data) = self.nodes.remove(&current) {
                stack.extend(data.children);
                removed.push(current);
            }
        }
        removed
    }

    /// Unlink `id` from its parent's child list. Returns the parent and the
    /// index the node occupied.
    pub fn detach(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.nodes.get(&id)?.parent?;
        let siblings = &mut self.nodes.get_mut(&parent)?.children;
        let index = siblings.iter().position(|c| *c == id)?;
        siblings.remove(index);
        if let Some(data) = self.nodes.get_mut(&id) {
            data.parent = None;
        }
        Some((parent, index))
    }

    /// Link a detached node under `parent` at `index` (clamped).
    pub fn attach(&mut self, id: NodeId, parent: NodeId, index: usize) -> usize {
        let Some(parent_data) = self.nodes.get_mut(&parent) else {
            return 0;
        };
        let index = index.min(parent_data.children.len());
        parent_data.children.insert(index, id);
        if let Some(data) = self.nodes.get_mut(&id) {
            data.parent = Some(parent);
        }
        index
    }
}

impl crate::path::TreeRead for NodeArena {
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn is_container(&self, id: NodeId) -> bool {
        self.get(id).map(|n| n.container).unwrap_or(false)
    }

    fn contains(&self, id: NodeId) -> bool {
        NodeArena::contains(self, id)
    }
}
