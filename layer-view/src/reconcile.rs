//! The rebuild pipeline.
//!
//! A run is split into a synchronous capture and an asynchronous tail:
//!
//! 1. capture widget expansion, selection and scroll (as nodes and paths)
//! 2. feed the document root to the widget
//! 3. compute expand / selection / scroll targets for the run's mode
//! 4. expand
//! 5. settle, then apply selection and scroll, push action state, persist
//!
//! Only the capture runs in the caller's turn. Every later stage awaits the
//! previous one, and a widget failure stops the run before anything is
//! applied or persisted.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use layer_model::path::{paths_of, resolve_all};
use layer_model::{Document, NodeId, NodePath, TreeRead, path_of};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::actions::{self, ActionState, ActionSurface};
use crate::config::LayerViewConfig;
use crate::error::ReconcileError;
use crate::notify::{Notice, Notifier};
use crate::snapshot::{SnapshotStore, StateSnapshot};
use crate::widget::{TreeWidget, WidgetInput};

/// Where a run takes its expansion and selection targets from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildMode {
    /// A model was bound: load the persisted snapshot from the session.
    Recover,
    /// The root was replaced: re-resolve the captured expanded and selected
    /// paths against the new root.
    Refresh,
    /// Same tree, incremental edits: reuse the captured expanded nodes.
    Incremental,
}

impl std::fmt::Display for RebuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recover => write!(f, "recover"),
            Self::Refresh => write!(f, "refresh"),
            Self::Incremental => write!(f, "incremental"),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every stage ran and the snapshot was persisted.
    Completed,
    /// No model (or a model without root) was bound; the widget was emptied.
    Unbound,
    /// A widget stage failed; nothing was applied or persisted.
    Aborted,
}

/// Counters over the lifetime of a reconciler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub runs_started: u64,
    /// Includes runs that ended [`RunOutcome::Unbound`].
    pub runs_completed: u64,
    pub runs_aborted: u64,
    pub selection_syncs: u64,
}

#[derive(Debug, Default)]
struct Counters {
    started: AtomicU64,
    completed: AtomicU64,
    aborted: AtomicU64,
    selection_syncs: AtomicU64,
}

/// State recorded synchronously when a run starts.
#[derive(Debug)]
struct Capture {
    mode: RebuildMode,
    target: Option<(Document, NodeId)>,
    expanded: Vec<NodeId>,
    expanded_paths: Vec<NodePath>,
    selected_paths: Vec<NodePath>,
    scroll: u32,
}

/// What the expand and finalize stages apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    pub expand: Vec<NodeId>,
    pub selection: Vec<NodeId>,
    pub scroll: u32,
}

/// Sole writer of the widget's input and presentation state.
pub struct TreeReconciler {
    widget: Arc<dyn TreeWidget>,
    model: RwLock<Option<Document>>,
    actions: Arc<dyn ActionSurface>,
    notifier: Arc<dyn Notifier>,
    config: LayerViewConfig,
    runtime: Handle,
    counters: Counters,
}

impl TreeReconciler {
    pub fn new(
        widget: Arc<dyn TreeWidget>,
        actions: Arc<dyn ActionSurface>,
        notifier: Arc<dyn Notifier>,
        config: LayerViewConfig,
        runtime: Handle,
    ) -> Self {
        Self {
            widget,
            model: RwLock::new(None),
            actions,
            notifier,
            config,
            runtime,
            counters: Counters::default(),
        }
    }

    pub fn widget(&self) -> &Arc<dyn TreeWidget> {
        &self.widget
    }

    pub fn config(&self) -> &LayerViewConfig {
        &self.config
    }

    /// The bound document, if any.
    pub fn model(&self) -> Option<Document> {
        self.model
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the bound document, returning the previous one.
    pub fn set_model(&self, model: Option<Document>) -> Option<Document> {
        let mut guard = self
            .model
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, model)
    }

    pub fn stats(&self) -> ReconcileStats {
        ReconcileStats {
            runs_started: self.counters.started.load(Ordering::SeqCst),
            runs_completed: self.counters.completed.load(Ordering::SeqCst),
            runs_aborted: self.counters.aborted.load(Ordering::SeqCst),
            selection_syncs: self.counters.selection_syncs.load(Ordering::SeqCst),
        }
    }

    // -------------------------------------------------------------------------
    // Runs
    // -------------------------------------------------------------------------

    /// Capture now and finish the run on the runtime.
    pub fn start(self: &Arc<Self>, mode: RebuildMode) -> JoinHandle<RunOutcome> {
        let capture = self.capture(mode);
        let this = Arc::clone(self);
        self.runtime.spawn(async move { this.finish(capture).await })
    }

    fn capture(&self, mode: RebuildMode) -> Capture {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        let target = self
            .model()
            .and_then(|document| document.root().map(|root| (document, root)));
        let (expanded, expanded_paths, selected_paths, scroll) = match &target {
            Some((document, _)) => {
                // After a root swap the widget still shows retired nodes;
                // their paths come from the tree they were part of.
                let locate = |node: &NodeId| {
                    path_of(document, *node).or_else(|| document.former_path(*node))
                };
                let expanded = self.widget.expanded_elements();
                let expanded_paths: Vec<NodePath> = expanded.iter().filter_map(locate).collect();
                let selected_paths: Vec<NodePath> =
                    self.widget.selection().iter().filter_map(locate).collect();
                (expanded, expanded_paths, selected_paths, self.widget.scroll_position())
            }
            None => (Vec::new(), Vec::new(), Vec::new(), 0),
        };

        Capture {
            mode,
            target,
            expanded,
            expanded_paths,
            selected_paths,
            scroll,
        }
    }

    async fn finish(&self, capture: Capture) -> RunOutcome {
        let mode = capture.mode;
        match self.pipeline(capture).await {
            Ok(outcome) => {
                self.counters.completed.fetch_add(1, Ordering::SeqCst);
                log::debug!("{mode} run finished: {outcome:?}");
                outcome
            }
            Err(e) => self.abort(mode, e),
        }
    }

    async fn pipeline(&self, capture: Capture) -> Result<RunOutcome, ReconcileError> {
        let Some((document, root)) = capture.target.clone() else {
            self.widget.set_input(None).await?;
            self.widget.layout(None);
            self.actions.apply(ActionState::disabled());
            return Ok(RunOutcome::Unbound);
        };

        log::debug!("{} run: feeding {root}", capture.mode);
        self.widget
            .set_input(Some(WidgetInput::new(document.clone(), root)))
            .await?;

        let targets = Self::compute_targets(&document, root, capture);
        log::debug!(
            "targets: {} expanded, {} selected, scroll {}",
            targets.expand.len(),
            targets.selection.len(),
            targets.scroll
        );

        self.widget.expand_all(&targets.expand).await?;
        self.settle().await;
        self.finalize(&document, &targets.selection, Some(targets.scroll));
        Ok(RunOutcome::Completed)
    }

    fn compute_targets(document: &Document, root: NodeId, capture: Capture) -> Targets {
        let is_container = |node: NodeId| document.is_container(node);
        let not_root = |node: NodeId| node != root;

        // The document owns what is selected; a persisted selection is
        // never restored.
        let (expand, mut selection, scroll) = match capture.mode {
            RebuildMode::Recover => {
                let persisted = SnapshotStore::load(&document.session());
                (
                    resolve_all(document, root, &persisted.expanded_paths, is_container),
                    Vec::new(),
                    persisted.scroll_position,
                )
            }
            RebuildMode::Refresh => (
                resolve_all(document, root, &capture.expanded_paths, is_container),
                resolve_all(document, root, &capture.selected_paths, not_root),
                capture.scroll,
            ),
            RebuildMode::Incremental => (
                capture
                    .expanded
                    .into_iter()
                    .filter(|node| document.contains(*node))
                    .collect(),
                Vec::new(),
                capture.scroll,
            ),
        };

        selection.extend(document.selected_nodes());
        let selection = dedup(selection);
        let expand = with_ancestors(document, expand, &selection);
        Targets {
            expand,
            selection,
            scroll,
        }
    }

    async fn settle(&self) {
        if self.config.settle_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.config.settle_delay).await;
        }
    }

    /// Apply selection and scroll, push action state, persist.
    fn finalize(&self, document: &Document, selection: &[NodeId], scroll: Option<u32>) {
        self.widget.set_selection(selection);
        if self.config.reveal_selection
            && let Some(last) = selection.last()
        {
            self.widget.reveal(*last);
        }
        if let Some(scroll) = scroll {
            self.widget.set_scroll_position(scroll);
        }
        self.actions
            .apply(actions::evaluate(document, &self.widget.selection()));
        self.persist(document);
    }

    fn persist(&self, document: &Document) {
        let snapshot = StateSnapshot {
            expanded_paths: paths_of(document, &self.widget.expanded_elements()),
            selected_paths: paths_of(document, &self.widget.selection()),
            scroll_position: self.widget.scroll_position(),
        };
        if let Err(e) = SnapshotStore::save(&document.session(), &snapshot) {
            log::warn!("layer state not persisted: {e}");
            self.notifier
                .notify(Notice::warning(format!("Layer state not saved: {e}")));
        }
    }

    fn abort(&self, mode: RebuildMode, error: ReconcileError) -> RunOutcome {
        self.counters.aborted.fetch_add(1, Ordering::SeqCst);
        log::error!("{mode} run aborted: {error}");
        self.notifier
            .notify(Notice::error(format!("Layer view update failed: {error}")));
        RunOutcome::Aborted
    }

    // -------------------------------------------------------------------------
    // Selection sync
    // -------------------------------------------------------------------------

    /// Follow the document's selection on the runtime.
    pub fn start_selection_sync(self: &Arc<Self>) -> JoinHandle<RunOutcome> {
        let this = Arc::clone(self);
        self.runtime.spawn(async move { this.sync_selection().await })
    }

    /// Expand the ancestors of the document's selection, then apply it.
    /// The widget keeps its current input.
    pub async fn sync_selection(&self) -> RunOutcome {
        self.counters.selection_syncs.fetch_add(1, Ordering::SeqCst);
        let Some(document) = self.model() else {
            return RunOutcome::Unbound;
        };
        if document.root().is_none() {
            return RunOutcome::Unbound;
        }

        let selection = document.selected_nodes();
        let expand = with_ancestors(&document, Vec::new(), &selection);
        self.widget.refresh();
        if let Err(e) = self.widget.expand_all(&expand).await {
            log::error!("selection sync aborted: {e}");
            self.notifier
                .notify(Notice::error(format!("Layer view update failed: {e}")));
            return RunOutcome::Aborted;
        }
        self.settle().await;
        self.finalize(&document, &selection, None);
        RunOutcome::Completed
    }
}

impl std::fmt::Debug for TreeReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeReconciler")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn dedup(nodes: Vec<NodeId>) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    nodes.into_iter().filter(|node| seen.insert(*node)).collect()
}

/// `expand` extended by every ancestor of every selected node, root first,
/// without duplicates.
pub fn with_ancestors(tree: &impl TreeRead, expand: Vec<NodeId>, selection: &[NodeId]) -> Vec<NodeId> {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut out: Vec<NodeId> = expand.into_iter().filter(|n| seen.insert(*n)).collect();
    for node in selection {
        for ancestor in tree.ancestors(*node).into_iter().rev() {
            if seen.insert(ancestor) {
                out.push(ancestor);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use layer_model::NodeSpec;

    // root -> A -> B -> C
    fn chain() -> Document {
        Document::with_root(NodeSpec::container().child(
            NodeSpec::container().with_id("A").child(
                NodeSpec::container()
                    .with_id("B")
                    .child(NodeSpec::leaf().with_id("C")),
            ),
        ))
    }

    #[test]
    fn test_ancestors_of_selection_are_expanded() {
        let doc = chain();
        let id = |name| doc.find_by_identifier(name).unwrap();
        let expand = with_ancestors(&doc, Vec::new(), &[id("C")]);
        assert_eq!(expand, vec![doc.root().unwrap(), id("A"), id("B")]);
    }

    #[test]
    fn test_ancestors_are_not_duplicated() {
        let doc = chain();
        let id = |name| doc.find_by_identifier(name).unwrap();
        let expand = with_ancestors(&doc, vec![id("A"), id("A")], &[id("C"), id("B")]);
        assert_eq!(expand, vec![id("A"), doc.root().unwrap(), id("B")]);
    }

    #[test]
    fn test_refresh_targets_follow_paths() {
        let doc = chain();
        let root = doc.root().unwrap();
        let capture = Capture {
            mode: RebuildMode::Refresh,
            target: Some((doc.clone(), root)),
            expanded: Vec::new(),
            expanded_paths: vec![NodePath::from([0]), NodePath::from([0, 0, 0]), NodePath::from([3])],
            selected_paths: vec![NodePath::from([0, 0]), NodePath::from([0, 9])],
            scroll: 7,
        };
        let targets = TreeReconciler::compute_targets(&doc, root, capture);
        let id = |name| doc.find_by_identifier(name).unwrap();

        // [0,0,0] is a leaf and [3] does not resolve.
        assert_eq!(targets.expand, vec![id("A"), root]);
        assert_eq!(targets.selection, vec![id("B")]);
        assert_eq!(targets.scroll, 7);
    }

    #[test]
    fn test_incremental_targets_keep_captured_nodes() {
        let doc = chain();
        let root = doc.root().unwrap();
        let id = |name| doc.find_by_identifier(name).unwrap();
        doc.select(&[id("C")]);
        let capture = Capture {
            mode: RebuildMode::Incremental,
            target: Some((doc.clone(), root)),
            expanded: vec![id("A")],
            expanded_paths: Vec::new(),
            selected_paths: vec![NodePath::from([0])],
            scroll: 3,
        };
        let targets = TreeReconciler::compute_targets(&doc, root, capture);
        assert_eq!(targets.expand, vec![id("A"), root, id("B")]);
        assert_eq!(targets.selection, vec![id("C")]);
        assert_eq!(targets.scroll, 3);
    }

    #[test]
    fn test_recover_targets_skip_persisted_selection() {
        let doc = chain();
        let root = doc.root().unwrap();
        let id = |name| doc.find_by_identifier(name).unwrap();
        SnapshotStore::save(
            &doc.session(),
            &StateSnapshot {
                expanded_paths: vec![NodePath::from([0])],
                selected_paths: vec![NodePath::from([0, 0])],
                scroll_position: 5,
            },
        )
        .unwrap();
        let capture = || Capture {
            mode: RebuildMode::Recover,
            target: Some((doc.clone(), root)),
            expanded: Vec::new(),
            expanded_paths: Vec::new(),
            selected_paths: Vec::new(),
            scroll: 0,
        };

        let targets = TreeReconciler::compute_targets(&doc, root, capture());
        assert_eq!(targets.expand, vec![id("A")]);
        assert!(targets.selection.is_empty());
        assert_eq!(targets.scroll, 5);

        doc.select(&[id("C")]);
        let targets = TreeReconciler::compute_targets(&doc, root, capture());
        assert_eq!(targets.selection, vec![id("C")]);
    }
}
