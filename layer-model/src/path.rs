//! Structural paths and the codec between nodes and paths.
//!
//! A [`NodePath`] addresses a node by the child index taken at every depth,
//! starting from a tree root. Node ids do not survive a root replacement,
//! paths do: after a rebuild the same path is resolved again against the
//! new tree and either yields the node now occupying that position or
//! nothing.

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// Read access to tree structure.
///
/// Implemented by [`Document`](crate::Document); anything else that can
/// answer parent/child questions may implement it too.
pub trait TreeRead {
    /// Parent of `id`, `None` for a root or an unknown node.
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Ordered children of `id`. Empty for leaves and unknown nodes.
    fn children(&self, id: NodeId) -> Vec<NodeId>;

    /// Whether `id` has the container capability.
    fn is_container(&self, id: NodeId) -> bool;

    /// Whether `id` currently exists.
    fn contains(&self, id: NodeId) -> bool;

    /// Number of ancestors between `id` and its root.
    fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            out.push(parent);
            current = parent;
        }
        out
    }
}

/// Root-to-node sequence of child indices. Empty means the root itself.
///
/// Paths order lexicographically, which is document (pre-)order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The path of the root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of steps from the root.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl<const N: usize> From<[usize; N]> for NodePath {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

/// Compute the path of `node` by walking parent links up to its root.
///
/// Returns `None` if `node` does not exist (anymore) or a parent link is
/// inconsistent with the parent's child list.
pub fn path_of(tree: &impl TreeRead, node: NodeId) -> Option<NodePath> {
    if !tree.contains(node) {
        return None;
    }
    let mut indices = Vec::new();
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        let index = tree.children(parent).iter().position(|c| *c == current)?;
        indices.push(index);
        current = parent;
    }
    indices.reverse();
    Some(NodePath(indices))
}

/// Resolve `path` against `root`. Any out-of-range index yields `None`.
pub fn node_at(tree: &impl TreeRead, root: NodeId, path: &NodePath) -> Option<NodeId> {
    if !tree.contains(root) {
        return None;
    }
    let mut current = root;
    for &index in path.indices() {
        current = *tree.children(current).get(index)?;
    }
    Some(current)
}

/// Resolve every path, silently dropping the ones that no longer denote a
/// node or whose node fails `keep`.
pub fn resolve_all<F>(tree: &impl TreeRead, root: NodeId, paths: &[NodePath], keep: F) -> Vec<NodeId>
where
    F: Fn(NodeId) -> bool,
{
    paths
        .iter()
        .filter_map(|path| node_at(tree, root, path))
        .filter(|node| keep(*node))
        .collect()
}

/// Paths of every node that still exists, in input order.
pub fn paths_of(tree: &impl TreeRead, nodes: &[NodeId]) -> Vec<NodePath> {
    nodes.iter().filter_map(|node| path_of(tree, *node)).collect()
}
