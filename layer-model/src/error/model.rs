//! Structural edit error types

use crate::node::NodeId;

/// Errors raised by structural edits on a [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The node id does not resolve in this document.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Children were requested on a node without the container capability.
    #[error("node {0} cannot hold children")]
    NotAContainer(NodeId),

    /// The root node cannot be removed or moved.
    #[error("the root node cannot be removed")]
    RootNotRemovable,

    /// The edit requires a selection.
    #[error("selection is empty")]
    EmptySelection,

    /// Grouping requires every selected node at the same depth.
    #[error("selected nodes are not at the same depth")]
    MixedDepth,

    /// The edit is not valid for the current selection.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
}
