//! Host-facing facade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use layer_model::{Document, DocumentEvent, NodeId, Subscription};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::actions::{self, ActionSurface, HeaderAction, SharedActionState};
use crate::config::LayerViewConfig;
use crate::debounce::{ChangeDebouncer, ChangeKind, RebuildTrigger};
use crate::error::ReconcileError;
use crate::notify::{LogNotifier, Notifier};
use crate::reconcile::{RebuildMode, ReconcileStats, RunOutcome, TreeReconciler};
use crate::widget::{TreeWidget, Viewport};

/// Builder for [`LayerView`].
pub struct LayerViewBuilder {
    widget: Arc<dyn TreeWidget>,
    config: LayerViewConfig,
    notifier: Arc<dyn Notifier>,
    actions: Arc<dyn ActionSurface>,
    runtime: Option<Handle>,
}

impl LayerViewBuilder {
    pub fn config(mut self, config: LayerViewConfig) -> Self {
        self.config = config;
        self
    }

    /// Where widget failures are reported. Defaults to [`LogNotifier`].
    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Where header action enablement is pushed. Defaults to a
    /// [`SharedActionState`] nobody reads.
    pub fn action_surface(mut self, surface: impl ActionSurface + 'static) -> Self {
        self.actions = Arc::new(surface);
        self
    }

    /// Runtime that timers and runs are spawned on. Defaults to the
    /// runtime `build` is called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<LayerView, ReconcileError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current()?,
        };

        let reconciler = Arc::new(TreeReconciler::new(
            self.widget,
            self.actions,
            self.notifier,
            self.config.clone(),
            runtime.clone(),
        ));
        let weak = Arc::downgrade(&reconciler);
        let trigger: RebuildTrigger = Arc::new(move |mode| {
            if let Some(reconciler) = weak.upgrade() {
                drop(reconciler.start(mode));
            }
        });
        let debouncer = Arc::new(ChangeDebouncer::new(
            self.config.debounce_window,
            runtime,
            trigger,
        ));

        Ok(LayerView {
            reconciler,
            debouncer,
            subscription: Mutex::new(None),
            disposed: AtomicBool::new(false),
        })
    }
}

/// Keeps a tree widget in sync with a bound [`Document`].
///
/// Document events are routed through a [`ChangeDebouncer`] into
/// [`TreeReconciler`] runs; selection changes are followed without
/// rebuilding. Expansion, selection and scroll survive rebuilds through the
/// document's session bag.
///
/// # Example
///
/// ```
/// use layer_model::{Document, NodeSpec};
/// use layer_view::{LayerView, RunOutcome};
/// use layer_view::widget::TreeView;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let widget = TreeView::new();
/// let view = LayerView::builder(widget.clone()).build().unwrap();
///
/// let doc = Document::with_root(NodeSpec::container().child(NodeSpec::leaf()));
/// let run = view.bind_model(Some(doc)).unwrap().unwrap();
/// assert_eq!(run.await.unwrap(), RunOutcome::Completed);
/// assert_eq!(widget.visible_len(), 1);
/// # });
/// ```
pub struct LayerView {
    reconciler: Arc<TreeReconciler>,
    debouncer: Arc<ChangeDebouncer>,
    subscription: Mutex<Option<Subscription>>,
    disposed: AtomicBool,
}

impl LayerView {
    pub fn builder(widget: impl TreeWidget + 'static) -> LayerViewBuilder {
        LayerViewBuilder {
            widget: Arc::new(widget),
            config: LayerViewConfig::default(),
            notifier: Arc::new(LogNotifier),
            actions: Arc::new(SharedActionState::new()),
            runtime: None,
        }
    }

    fn subscription(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_live(&self) -> Result<(), ReconcileError> {
        if self.is_disposed() {
            Err(ReconcileError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Bind a document (or none) and rebuild from its persisted state.
    ///
    /// Rebinding the same document is a no-op and returns `Ok(None)`.
    pub fn bind_model(
        &self,
        model: Option<Document>,
    ) -> Result<Option<JoinHandle<RunOutcome>>, ReconcileError> {
        self.ensure_live()?;
        let current = self.reconciler.model();
        let unchanged = match (&current, &model) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Ok(None);
        }

        let mut subscription = self.subscription();
        if let Some(mut old) = subscription.take() {
            old.dispose();
        }
        self.debouncer.cancel();
        *subscription = model.as_ref().map(|document| self.listen(document));
        self.reconciler.set_model(model);
        drop(subscription);

        log::debug!("model bound, recovering presentation state");
        Ok(Some(self.reconciler.start(RebuildMode::Recover)))
    }

    fn listen(&self, document: &Document) -> Subscription {
        let debouncer = Arc::downgrade(&self.debouncer);
        let reconciler = Arc::downgrade(&self.reconciler);
        document.subscribe(move |event| {
            log::trace!("document event: {}", event.name());
            if matches!(event, DocumentEvent::SelectionChanged) {
                if let Some(reconciler) = reconciler.upgrade() {
                    drop(reconciler.start_selection_sync());
                }
                return;
            }
            if let Some(kind) = ChangeKind::from_event(event)
                && let Some(debouncer) = debouncer.upgrade()
            {
                debouncer.notify(kind);
            }
        })
    }

    /// Relayout the widget for a new size. Does not rebuild.
    pub fn resize(&self, width: u16, height: u16) -> Result<(), ReconcileError> {
        self.ensure_live()?;
        self.reconciler
            .widget()
            .layout(Some(Viewport::new(width, height)));
        Ok(())
    }

    /// Rebuild now, re-resolving the current expansion and selection by path.
    /// Supersedes a pending debounced run.
    pub fn refresh(&self) -> Result<JoinHandle<RunOutcome>, ReconcileError> {
        self.ensure_live()?;
        self.debouncer.cancel();
        Ok(self.reconciler.start(RebuildMode::Refresh))
    }

    /// Replace the document's selection. The view follows through the
    /// resulting selection event.
    pub fn select(&self, nodes: &[NodeId]) -> Result<(), ReconcileError> {
        self.ensure_live()?;
        if let Some(document) = self.reconciler.model() {
            document.select(nodes);
        }
        Ok(())
    }

    /// Run a header action on the document's selection.
    ///
    /// Returns `Ok(false)` without touching the document when no model is
    /// bound or the action is disabled for the current selection.
    pub fn trigger(&self, action: HeaderAction) -> Result<bool, ReconcileError> {
        self.ensure_live()?;
        let Some(document) = self.reconciler.model() else {
            return Ok(false);
        };
        let state = actions::evaluate(&document, &document.selected_nodes());
        if !state.is_enabled(action) {
            log::debug!("{action:?} ignored: disabled for current selection");
            return Ok(false);
        }

        match action {
            HeaderAction::Delete => {
                document.remove_selected()?;
            }
            HeaderAction::Group => {
                document.group_selected()?;
            }
            HeaderAction::Ungroup => {
                document.ungroup_selected()?;
            }
        }
        Ok(true)
    }

    /// Release the document subscription and any pending timer. Idempotent;
    /// every other operation fails with [`ReconcileError::Disposed`] afterwards.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(mut subscription) = self.subscription().take() {
            subscription.dispose();
        }
        self.debouncer.cancel();
        self.reconciler.set_model(None);
        log::debug!("layer view disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// The bound document.
    pub fn model(&self) -> Option<Document> {
        self.reconciler.model()
    }

    pub fn widget(&self) -> &Arc<dyn TreeWidget> {
        self.reconciler.widget()
    }

    pub fn config(&self) -> &LayerViewConfig {
        self.reconciler.config()
    }

    /// Whether a debounced rebuild is waiting for its window to pass.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn stats(&self) -> ReconcileStats {
        self.reconciler.stats()
    }
}

impl std::fmt::Debug for LayerView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerView")
            .field("disposed", &self.is_disposed())
            .field("reconciler", &self.reconciler)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}
