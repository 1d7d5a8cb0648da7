//! Shared fixtures for layer view integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use layer_model::{Document, NodeId, NodeSpec};
use layer_view::widget::{TreeView, TreeWidget, Viewport, WidgetInput};
use layer_view::{
    LayerView, RecordingNotifier, RunOutcome, SharedActionState, Stage, WidgetError,
};
use simplelog::{Config, LevelFilter, TestLogger};
use tokio::time::Instant;

pub fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Trace, Config::default());
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn id(doc: &Document, name: &str) -> NodeId {
    doc.find_by_identifier(name)
        .unwrap_or_else(|| panic!("no node named {name}"))
}

/// root
/// ├── layer0 (container)
/// │   ├── sprite
/// │   ├── layer01 (container)
/// │   │   └── deep
/// │   └── label
/// ├── layer1 (container)
/// │   └── button
/// └── footer
pub fn scene() -> Document {
    Document::with_root(scene_spec())
}

pub fn scene_spec() -> NodeSpec {
    NodeSpec::container().with_id("root").children([
        NodeSpec::container().with_id("layer0").children([
            NodeSpec::leaf().with_id("sprite"),
            NodeSpec::container()
                .with_id("layer01")
                .child(NodeSpec::leaf().with_id("deep")),
            NodeSpec::leaf().with_id("label"),
        ]),
        NodeSpec::container()
            .with_id("layer1")
            .child(NodeSpec::leaf().with_id("button")),
        NodeSpec::leaf().with_id("footer"),
    ])
}

pub struct Harness {
    pub view: LayerView,
    pub widget: ScriptedWidget,
    pub notifier: RecordingNotifier,
    pub actions: SharedActionState,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_widget(ScriptedWidget::new())
    }

    pub fn with_widget(widget: ScriptedWidget) -> Self {
        init_logger();
        let notifier = RecordingNotifier::new();
        let actions = SharedActionState::new();
        let view = LayerView::builder(widget.clone())
            .notifier(notifier.clone())
            .action_surface(actions.clone())
            .build()
            .expect("tests run inside a runtime");
        Self {
            view,
            widget,
            notifier,
            actions,
        }
    }

    /// Bind `doc` and wait for the recovery run.
    pub async fn bind(&self, doc: &Document) -> RunOutcome {
        self.view
            .bind_model(Some(doc.clone()))
            .unwrap()
            .expect("binding a new document starts a run")
            .await
            .unwrap()
    }
}

/// A widget mutation as the double saw it once the call returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: &'static str,
    pub at: Instant,
    pub selection: Vec<NodeId>,
    pub scroll: u32,
}

/// A [`TreeView`] whose feed and expand stages can be made to fail, and
/// which records every mutating call in order.
#[derive(Clone, Default)]
pub struct ScriptedWidget {
    pub view: TreeView,
    fail_feed: Arc<AtomicBool>,
    fail_expand: Arc<AtomicBool>,
    feeds: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        Self {
            view: TreeView::with_viewport(viewport),
            ..Self::default()
        }
    }

    fn record(&self, name: &'static str) {
        let call = Call {
            name,
            at: Instant::now(),
            selection: self.view.selection(),
            scroll: self.view.scroll_position(),
        };
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(|call| call.name).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_feed(&self, fail: bool) {
        self.fail_feed.store(fail, Ordering::SeqCst);
    }

    pub fn fail_expand(&self, fail: bool) {
        self.fail_expand.store(fail, Ordering::SeqCst);
    }

    /// Number of accepted `set_input` calls.
    pub fn feeds(&self) -> usize {
        self.feeds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TreeWidget for ScriptedWidget {
    async fn set_input(&self, input: Option<WidgetInput>) -> Result<(), WidgetError> {
        if self.fail_feed.load(Ordering::SeqCst) {
            return Err(WidgetError::rejected(Stage::Feed, "scripted failure"));
        }
        self.feeds.fetch_add(1, Ordering::SeqCst);
        self.view.set_input(input).await?;
        self.record("set_input");
        Ok(())
    }

    async fn expand_all(&self, nodes: &[NodeId]) -> Result<(), WidgetError> {
        if self.fail_expand.load(Ordering::SeqCst) {
            return Err(WidgetError::rejected(Stage::Expand, "scripted failure"));
        }
        self.view.expand_all(nodes).await?;
        self.record("expand_all");
        Ok(())
    }

    fn expanded_elements(&self) -> Vec<NodeId> {
        self.view.expanded_elements()
    }

    fn selection(&self) -> Vec<NodeId> {
        self.view.selection()
    }

    fn set_selection(&self, nodes: &[NodeId]) {
        self.view.set_selection(nodes);
        self.record("set_selection");
    }

    fn scroll_position(&self) -> u32 {
        self.view.scroll_position()
    }

    fn set_scroll_position(&self, position: u32) {
        self.view.set_scroll_position(position);
        self.record("set_scroll_position");
    }

    fn reveal(&self, node: NodeId) {
        self.view.reveal(node);
        self.record("reveal");
    }

    fn refresh(&self) {
        self.view.refresh();
        self.record("refresh");
    }

    fn layout(&self, viewport: Option<Viewport>) {
        self.view.layout(viewport)
    }
}
