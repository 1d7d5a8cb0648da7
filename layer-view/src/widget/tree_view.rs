//! In-memory tree widget.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use layer_model::{NodeId, TreeRead};

use super::{TreeWidget, Viewport, WidgetInput};
use crate::error::WidgetError;

/// Unique identifier for a TreeView instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeViewId(usize);

impl TreeViewId {
    fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for TreeViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "__tree_view_{}", self.0)
    }
}

/// A visible row in the flattened tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRow {
    pub node: NodeId,
    /// Depth below the input root (0 = top-level row).
    pub depth: u16,
    pub has_children: bool,
    pub is_expanded: bool,
}

#[derive(Debug, Default)]
struct TreeViewInner {
    input: Option<WidgetInput>,
    /// Expanded nodes. The input root is implicitly expanded and never stored.
    expanded: HashSet<NodeId>,
    /// Flattened visible rows (rebuilt on expand/collapse/input change).
    visible: Vec<FlatRow>,
    /// Selected nodes in selection order.
    selection: Vec<NodeId>,
    /// Scroll offset in rows.
    scroll_offset: u32,
    viewport: Viewport,
}

/// A tree widget holding its presentation state in memory.
///
/// The input root is not shown as a row; its children are the top-level
/// rows. Replacing the input discards expansion, selection and scroll
/// offset, the same way a rendering widget drops its row model when its
/// data is swapped.
///
/// `TreeView` is cheap to clone; clones share state.
///
/// # Example
///
/// ```
/// use layer_model::{Document, NodeSpec};
/// use layer_view::widget::{TreeView, TreeWidget, WidgetInput};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let doc = Document::with_root(
///     NodeSpec::container().child(NodeSpec::container().child(NodeSpec::leaf())),
/// );
/// let root = doc.root().unwrap();
/// let view = TreeView::new();
/// view.set_input(Some(WidgetInput::new(doc.clone(), root))).await.unwrap();
/// assert_eq!(view.visible_len(), 1);
///
/// let group = view.visible_row(0).unwrap().node;
/// view.expand_all(&[group]).await.unwrap();
/// assert_eq!(view.visible_len(), 2);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TreeView {
    id: TreeViewId,
    inner: Arc<RwLock<TreeViewInner>>,
    dirty: Arc<AtomicBool>,
}

impl TreeView {
    /// Create an empty widget.
    pub fn new() -> Self {
        Self {
            id: TreeViewId::new(),
            inner: Arc::new(RwLock::new(TreeViewInner::default())),
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create an empty widget with a viewport already laid out.
    pub fn with_viewport(viewport: Viewport) -> Self {
        let view = Self::new();
        view.write().viewport = viewport;
        view
    }

    pub fn id(&self) -> TreeViewId {
        self.id
    }

    fn read(&self) -> RwLockReadGuard<'_, TreeViewInner> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TreeViewInner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -------------------------------------------------------------------------
    // Input and rows
    // -------------------------------------------------------------------------

    /// The node currently used as root, if any.
    pub fn root(&self) -> Option<NodeId> {
        self.read().input.as_ref().map(|i| i.root)
    }

    /// Whether the widget has backing data.
    pub fn has_input(&self) -> bool {
        self.read().input.is_some()
    }

    pub fn visible_len(&self) -> usize {
        self.read().visible.len()
    }

    pub fn visible_row(&self, index: usize) -> Option<FlatRow> {
        self.read().visible.get(index).copied()
    }

    /// All visible rows in display order.
    pub fn rows(&self) -> Vec<FlatRow> {
        self.read().visible.clone()
    }

    /// Index of the row showing `node`, if it is visible.
    pub fn row_index(&self, node: NodeId) -> Option<usize> {
        self.read().visible.iter().position(|r| r.node == node)
    }

    fn belongs(input: &WidgetInput, node: NodeId) -> bool {
        if node == input.root {
            return true;
        }
        input.document.ancestors(node).contains(&input.root)
    }

    /// Rebuild the flattened visible row list.
    fn rebuild_visible(inner: &mut TreeViewInner) {
        inner.visible.clear();
        if let Some(input) = &inner.input {
            Self::collect_visible(input, input.root, &inner.expanded, 0, &mut inner.visible);
        }
        Self::clamp_scroll(inner);
    }

    fn collect_visible(
        input: &WidgetInput,
        parent: NodeId,
        expanded: &HashSet<NodeId>,
        depth: u16,
        out: &mut Vec<FlatRow>,
    ) {
        for node in input.document.children(parent) {
            let has_children = !input.document.children(node).is_empty();
            let is_expanded = expanded.contains(&node);
            out.push(FlatRow {
                node,
                depth,
                has_children,
                is_expanded,
            });
            if is_expanded && has_children {
                Self::collect_visible(input, node, expanded, depth + 1, out);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Expand/Collapse
    // -------------------------------------------------------------------------

    pub fn is_expanded(&self, node: NodeId) -> bool {
        let guard = self.read();
        guard.expanded.contains(&node) || guard.input.as_ref().is_some_and(|i| i.root == node)
    }

    /// Expand a single node. Returns whether anything changed.
    pub fn expand(&self, node: NodeId) -> bool {
        let mut guard = self.write();
        let changed = Self::insert_expanded(&mut guard, node);
        if changed {
            Self::rebuild_visible(&mut guard);
            self.dirty.store(true, Ordering::SeqCst);
        }
        changed
    }

    fn insert_expanded(inner: &mut TreeViewInner, node: NodeId) -> bool {
        let Some(input) = &inner.input else {
            return false;
        };
        if node == input.root
            || !input.document.is_container(node)
            || !Self::belongs(input, node)
        {
            return false;
        }
        inner.expanded.insert(node)
    }

    /// Collapse a node.
    pub fn collapse(&self, node: NodeId) {
        let mut guard = self.write();
        if guard.expanded.remove(&node) {
            Self::rebuild_visible(&mut guard);
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    /// Toggle expand/collapse for a node.
    pub fn toggle(&self, node: NodeId) {
        if self.read().expanded.contains(&node) {
            self.collapse(node);
        } else {
            self.expand(node);
        }
    }

    /// Collapse all nodes.
    pub fn collapse_all(&self) {
        let mut guard = self.write();
        guard.expanded.clear();
        Self::rebuild_visible(&mut guard);
        self.dirty.store(true, Ordering::SeqCst);
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn is_selected(&self, node: NodeId) -> bool {
        self.read().selection.contains(&node)
    }

    // -------------------------------------------------------------------------
    // Scrolling
    // -------------------------------------------------------------------------

    pub fn viewport(&self) -> Viewport {
        self.read().viewport
    }

    fn max_scroll_offset(inner: &TreeViewInner) -> u32 {
        (inner.visible.len() as u32).saturating_sub(u32::from(inner.viewport.height))
    }

    /// Clamp only once laid out; before that the content size is unknown.
    fn clamp_scroll(inner: &mut TreeViewInner) {
        if inner.viewport.height == 0 {
            return;
        }
        let max = Self::max_scroll_offset(inner);
        if inner.scroll_offset > max {
            inner.scroll_offset = max;
        }
    }

    /// Scroll the minimum amount to bring the row at `index` into view.
    pub fn scroll_to_index(&self, index: usize) {
        let mut guard = self.write();
        if index >= guard.visible.len() {
            return;
        }
        let viewport = u32::from(guard.viewport.height);
        if viewport == 0 {
            return;
        }
        let top = index as u32;
        if top < guard.scroll_offset {
            guard.scroll_offset = top;
            self.dirty.store(true, Ordering::SeqCst);
        } else if top + 1 > guard.scroll_offset + viewport {
            guard.scroll_offset = top + 1 - viewport;
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    /// Range of row indices inside the viewport.
    pub fn visible_range(&self) -> std::ops::Range<usize> {
        let guard = self.read();
        if guard.visible.is_empty() || guard.viewport.height == 0 {
            return 0..0;
        }
        let start = guard.scroll_offset as usize;
        let end = (start + usize::from(guard.viewport.height)).min(guard.visible.len());
        start.min(end)..end
    }

    // -------------------------------------------------------------------------
    // Dirty tracking
    // -------------------------------------------------------------------------

    /// Check if the widget has changed since the last [`clear_dirty`](Self::clear_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }
}

impl Default for TreeView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TreeWidget for TreeView {
    async fn set_input(&self, input: Option<WidgetInput>) -> Result<(), WidgetError> {
        {
            let mut guard = self.write();
            guard.input = input;
            guard.expanded.clear();
            guard.selection.clear();
            guard.scroll_offset = 0;
            Self::rebuild_visible(&mut guard);
        }
        self.dirty.store(true, Ordering::SeqCst);
        log::trace!("{} input replaced", self.id);
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn expand_all(&self, nodes: &[NodeId]) -> Result<(), WidgetError> {
        {
            let mut guard = self.write();
            let mut changed = false;
            for node in nodes {
                changed |= Self::insert_expanded(&mut guard, *node);
            }
            if changed {
                Self::rebuild_visible(&mut guard);
                self.dirty.store(true, Ordering::SeqCst);
            }
        }
        tokio::task::yield_now().await;
        Ok(())
    }

    fn expanded_elements(&self) -> Vec<NodeId> {
        let guard = self.read();
        let Some(input) = &guard.input else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = input.document.children(input.root);
        stack.reverse();
        while let Some(node) = stack.pop() {
            if guard.expanded.contains(&node) {
                out.push(node);
            }
            let mut children = input.document.children(node);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    fn selection(&self) -> Vec<NodeId> {
        self.read().selection.clone()
    }

    fn set_selection(&self, nodes: &[NodeId]) {
        let mut guard = self.write();
        let Some(input) = guard.input.clone() else {
            guard.selection.clear();
            return;
        };
        let mut seen = HashSet::new();
        guard.selection = nodes
            .iter()
            .copied()
            .filter(|n| *n != input.root && Self::belongs(&input, *n) && seen.insert(*n))
            .collect();
        self.dirty.store(true, Ordering::SeqCst);
    }

    fn scroll_position(&self) -> u32 {
        self.read().scroll_offset
    }

    fn set_scroll_position(&self, position: u32) {
        let mut guard = self.write();
        guard.scroll_offset = position;
        Self::clamp_scroll(&mut guard);
        self.dirty.store(true, Ordering::SeqCst);
    }

    fn reveal(&self, node: NodeId) {
        if let Some(index) = self.row_index(node) {
            self.scroll_to_index(index);
        }
    }

    fn refresh(&self) {
        let mut guard = self.write();
        Self::rebuild_visible(&mut guard);
        self.dirty.store(true, Ordering::SeqCst);
    }

    fn layout(&self, viewport: Option<Viewport>) {
        let mut guard = self.write();
        if let Some(viewport) = viewport {
            guard.viewport = viewport;
        }
        Self::clamp_scroll(&mut guard);
        self.dirty.store(true, Ordering::SeqCst);
    }
}
