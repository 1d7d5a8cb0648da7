//! Coalescing of document change notifications.
//!
//! Non-structural changes (node added, node removed, relevant property
//! change) arm a single timer; everything arriving while it is armed is
//! absorbed, and when it fires one incremental reconciliation runs against
//! the state at that moment. A structural reset cancels the timer and
//! reconciles immediately.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use layer_model::{DocumentEvent, ID_PROPERTY};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::reconcile::RebuildMode;

/// Class of a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    PropertyChanged,
    /// The root itself was replaced.
    StructuralReset,
}

impl ChangeKind {
    /// Classify a document event. Returns `None` for events that must not
    /// trigger a rebuild: selection changes, and property changes that
    /// touch neither the identifier nor a node-valued property.
    pub fn from_event(event: &DocumentEvent) -> Option<Self> {
        match event {
            DocumentEvent::NodeAdded { .. } => Some(Self::Added),
            DocumentEvent::NodeRemoved { .. } => Some(Self::Removed),
            DocumentEvent::RootChanged { .. } => Some(Self::StructuralReset),
            DocumentEvent::TreeChanged {
                property, value, ..
            } => {
                let relevant = property == ID_PROPERTY
                    || value.as_ref().and_then(|v| v.as_node()).is_some();
                relevant.then_some(Self::PropertyChanged)
            }
            DocumentEvent::SelectionChanged => None,
        }
    }

    pub fn is_structural(self) -> bool {
        matches!(self, Self::StructuralReset)
    }
}

/// Callback that starts a reconciliation run.
pub type RebuildTrigger = Arc<dyn Fn(RebuildMode) + Send + Sync>;

#[derive(Debug)]
struct Pending {
    generation: u64,
    timer: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct DebounceState {
    generation: u64,
    pending: Option<Pending>,
}

/// Two-state scheduler: idle, or pending with one armed timer.
///
/// The generation number guards against a timer that already woke up
/// when it got cancelled: only the timer that armed the current pending
/// state may fire.
pub struct ChangeDebouncer {
    state: Arc<Mutex<DebounceState>>,
    window: Duration,
    runtime: Handle,
    trigger: RebuildTrigger,
}

impl ChangeDebouncer {
    pub fn new(window: Duration, runtime: Handle, trigger: RebuildTrigger) -> Self {
        Self {
            state: Arc::new(Mutex::new(DebounceState::default())),
            window,
            runtime,
            trigger,
        }
    }

    fn lock(state: &Mutex<DebounceState>) -> MutexGuard<'_, DebounceState> {
        state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Feed one notification.
    pub fn notify(&self, kind: ChangeKind) {
        if kind.is_structural() {
            if self.cancel() {
                log::debug!("structural reset superseded pending rebuild");
            }
            (self.trigger)(RebuildMode::Refresh);
            return;
        }

        let mut guard = Self::lock(&self.state);
        if guard.pending.is_some() {
            log::trace!("{kind:?} absorbed by pending rebuild");
            return;
        }
        guard.generation += 1;
        let generation = guard.generation;
        let state = Arc::clone(&self.state);
        let trigger = Arc::clone(&self.trigger);
        let window = self.window;
        log::trace!("{kind:?} armed rebuild timer #{generation}");

        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            let fire = {
                let mut guard = Self::lock(&state);
                match &guard.pending {
                    Some(pending) if pending.generation == generation => {
                        guard.pending = None;
                        true
                    }
                    _ => false,
                }
            };
            if fire {
                trigger(RebuildMode::Incremental);
            }
        });
        guard.pending = Some(Pending { generation, timer });
    }

    /// Cancel the armed timer, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let pending = Self::lock(&self.state).pending.take();
        match pending {
            Some(pending) => {
                pending.timer.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a timer is armed.
    pub fn is_pending(&self) -> bool {
        Self::lock(&self.state).pending.is_some()
    }
}

impl std::fmt::Debug for ChangeDebouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDebouncer")
            .field("window", &self.window)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}
