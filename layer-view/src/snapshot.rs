//! Persisted presentation state.
//!
//! Expansion, selection and scroll position are kept in the document's
//! session bag as structural paths, so they outlive both widget rebuilds and
//! the view instance itself.

use layer_model::{NodePath, SessionData, SessionError};
use serde::{Deserialize, Serialize};

/// Session key holding the expanded paths.
pub const LAYER_EXPAND_LIST: &str = "layer_expand_list";

/// Session key holding the scroll position.
pub const LAYER_SCROLL_POS: &str = "layer_scroll_pos";

/// Session key holding the selected paths.
pub const LAYER_SELECTION_LIST: &str = "layer_selection_list";

/// Presentation state captured at the end of a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub expanded_paths: Vec<NodePath>,
    pub selected_paths: Vec<NodePath>,
    pub scroll_position: u32,
}

impl StateSnapshot {
    pub fn is_empty(&self) -> bool {
        self.expanded_paths.is_empty() && self.selected_paths.is_empty() && self.scroll_position == 0
    }
}

/// Reads and writes [`StateSnapshot`]s in a session bag.
///
/// Paths are stored as-is; whether they still resolve is decided when they
/// are used.
pub struct SnapshotStore;

impl SnapshotStore {
    /// Last persisted snapshot. Missing values read as empty; values that
    /// fail to decode are logged and read as empty too.
    pub fn load(session: &SessionData) -> StateSnapshot {
        StateSnapshot {
            expanded_paths: Self::read_or_default(session, LAYER_EXPAND_LIST),
            selected_paths: Self::read_or_default(session, LAYER_SELECTION_LIST),
            scroll_position: Self::read_or_default(session, LAYER_SCROLL_POS),
        }
    }

    fn read_or_default<T>(session: &SessionData, key: &str) -> T
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match session.get::<T>(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                log::warn!("ignoring unreadable session value: {e}");
                T::default()
            }
        }
    }

    /// Overwrite the persisted snapshot.
    pub fn save(session: &SessionData, snapshot: &StateSnapshot) -> Result<(), SessionError> {
        session.set(LAYER_EXPAND_LIST, &snapshot.expanded_paths)?;
        session.set(LAYER_SELECTION_LIST, &snapshot.selected_paths)?;
        session.set(LAYER_SCROLL_POS, &snapshot.scroll_position)?;
        Ok(())
    }
}
