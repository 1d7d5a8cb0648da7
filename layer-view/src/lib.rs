//! Layer view
//!
//! Keeps a hierarchical widget in sync with a [`layer_model::Document`]:
//! bursts of document events are debounced into single rebuilds, and
//! expansion, selection and scroll position are carried across every
//! rebuild by structural path.

pub mod actions;
pub mod config;
pub mod debounce;
pub mod error;
pub mod notify;
pub mod reconcile;
pub mod snapshot;
pub mod widget;

mod view;

pub use actions::{ActionState, ActionSurface, HeaderAction, SharedActionState};
pub use config::LayerViewConfig;
pub use debounce::ChangeKind;
pub use error::{ReconcileError, Stage, WidgetError};
pub use notify::{LogNotifier, Notice, NoticeLevel, Notifier, RecordingNotifier};
pub use reconcile::{RebuildMode, ReconcileStats, RunOutcome};
pub use snapshot::{SnapshotStore, StateSnapshot};
pub use view::{LayerView, LayerViewBuilder};
