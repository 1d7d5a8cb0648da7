//! Enablement of the selection-dependent header actions.

use std::sync::{Arc, RwLock};

use layer_model::{NodeId, TreeRead};

/// A header action that depends on the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderAction {
    Group,
    Ungroup,
    Delete,
}

/// Which header actions are currently available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionState {
    pub group: bool,
    pub ungroup: bool,
    pub delete: bool,
}

impl ActionState {
    /// Everything disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, action: HeaderAction) -> bool {
        match action {
            HeaderAction::Group => self.group,
            HeaderAction::Ungroup => self.ungroup,
            HeaderAction::Delete => self.delete,
        }
    }
}

/// Derive action enablement from a widget selection.
///
/// - delete: anything selected
/// - group: two or more nodes, all at exactly the same depth
/// - ungroup: exactly one node, and it is a container
pub fn evaluate(tree: &impl TreeRead, selection: &[NodeId]) -> ActionState {
    let group = match selection.split_first() {
        Some((first, rest)) if !rest.is_empty() => {
            let depth = tree.depth(*first);
            rest.iter().all(|node| tree.depth(*node) == depth)
        }
        _ => false,
    };
    let ungroup = match selection {
        [single] => tree.is_container(*single),
        _ => false,
    };
    ActionState {
        group,
        ungroup,
        delete: !selection.is_empty(),
    }
}

/// Receives action enablement after every finalize.
///
/// Implemented by whatever renders the header buttons.
pub trait ActionSurface: Send + Sync {
    fn apply(&self, state: ActionState);
}

/// An [`ActionSurface`] that remembers the last state, for hosts that poll.
#[derive(Debug, Clone, Default)]
pub struct SharedActionState {
    inner: Arc<RwLock<ActionState>>,
}

impl SharedActionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last applied state.
    pub fn get(&self) -> ActionState {
        self.inner
            .read()
            .map(|g| *g)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

impl ActionSurface for SharedActionState {
    fn apply(&self, state: ActionState) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = state;
        }
    }
}
