//! Hierarchical display widget abstraction.
//!
//! The reconciler drives a widget only through [`TreeWidget`]. The widget
//! owns presentation state (expansion, selection, scroll) for whatever input
//! it was last fed and forgets all of it when the input is replaced.

mod tree_view;

pub use tree_view::{FlatRow, TreeView, TreeViewId};

use async_trait::async_trait;
use layer_model::{Document, NodeId};

use crate::error::WidgetError;

/// Backing data handed to a widget: a document and the node shown as root.
#[derive(Debug, Clone)]
pub struct WidgetInput {
    pub document: Document,
    pub root: NodeId,
}

impl WidgetInput {
    pub fn new(document: Document, root: NodeId) -> Self {
        Self { document, root }
    }
}

/// Size of the area a widget lays out into, in rows and columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Operations the reconciler needs from a tree widget.
///
/// The asynchronous methods complete once the widget has consumed the
/// request; an `Err` aborts the reconciliation run that issued it.
#[async_trait]
pub trait TreeWidget: Send + Sync {
    /// Replace the backing data. `None` empties the widget.
    async fn set_input(&self, input: Option<WidgetInput>) -> Result<(), WidgetError>;

    /// Expand every given node that exists in the current input.
    async fn expand_all(&self, nodes: &[NodeId]) -> Result<(), WidgetError>;

    /// Currently expanded nodes, in tree order.
    fn expanded_elements(&self) -> Vec<NodeId>;

    /// Currently selected nodes, in selection order.
    fn selection(&self) -> Vec<NodeId>;

    fn set_selection(&self, nodes: &[NodeId]);

    fn scroll_position(&self) -> u32;

    fn set_scroll_position(&self, position: u32);

    /// Scroll so that `node` is inside the viewport.
    fn reveal(&self, node: NodeId);

    /// Re-read node data without touching presentation state.
    fn refresh(&self);

    /// Recompute layout, optionally for a new viewport size.
    fn layout(&self, viewport: Option<Viewport>);
}
