//! Selection-driven structural edits: delete, group and ungroup.

use std::collections::HashSet;

use crate::document::Document;
use crate::error::ModelError;
use crate::events::DocumentEvent;
use crate::node::{NodeId, NodeSpec};
use crate::path::{TreeRead, path_of};

impl Document {
    /// Remove every selected node. The root is never removed; nodes whose
    /// ancestor is also selected go away with that ancestor.
    ///
    /// Returns the number of subtrees removed.
    pub fn remove_selected(&self) -> Result<usize, ModelError> {
        let events = {
            let mut guard = self.write();
            if guard.selection.is_empty() {
                return Err(ModelError::EmptySelection);
            }
            let selected: HashSet<NodeId> = guard.selection.iter().copied().collect();
            let tops: Vec<NodeId> = guard
                .selection
                .iter()
                .copied()
                .filter(|id| guard.arena.parent(*id).is_some())
                .filter(|id| !guard.arena.ancestors(*id).iter().any(|a| selected.contains(a)))
                .collect();
            if tops.is_empty() {
                return Err(ModelError::RootNotRemovable);
            }

            let mut events = Vec::with_capacity(tops.len() + 1);
            for id in tops {
                if let Some((parent, _)) = guard.arena.detach(id) {
                    guard.arena.drop_subtree(id);
                    events.push(DocumentEvent::NodeRemoved { node: id, parent });
                }
            }
            let alive: Vec<NodeId> = guard
                .selection
                .iter()
                .copied()
                .filter(|id| guard.arena.contains(*id))
                .collect();
            guard.selection = alive;
            events.push(DocumentEvent::SelectionChanged);
            events
        };
        let removed = events.len() - 1;
        log::debug!("removed {removed} selected subtree(s)");
        self.emit_all(events);
        Ok(removed)
    }

    /// Wrap the selected nodes in a new container.
    ///
    /// Every selected node must sit at the same depth. The container is
    /// inserted where the first selected node (in document order) was, and
    /// becomes the new selection.
    pub fn group_selected(&self) -> Result<NodeId, ModelError> {
        let (group, events) = {
            let mut guard = self.write();
            if guard.selection.len() < 2 {
                return Err(ModelError::InvalidSelection(
                    "grouping needs at least two nodes".to_string(),
                ));
            }
            let depth = guard.arena.depth(guard.selection[0]);
            if guard.selection.iter().any(|id| guard.arena.depth(*id) != depth) {
                return Err(ModelError::MixedDepth);
            }

            let mut ordered: Vec<_> = guard
                .selection
                .iter()
                .map(|id| {
                    path_of(&guard.arena, *id)
                        .map(|path| (path, *id))
                        .ok_or(ModelError::UnknownNode(*id))
                })
                .collect::<Result<_, _>>()?;
            ordered.sort();

            let first = ordered[0].1;
            let parent = guard.arena.parent(first).ok_or(ModelError::RootNotRemovable)?;
            let index = guard
                .arena
                .children(parent)
                .iter()
                .position(|c| *c == first)
                .unwrap_or(0);

            let mut events = Vec::new();
            let group = guard.arena.build(NodeSpec::container(), None);
            guard.arena.attach(group, parent, index);
            events.push(DocumentEvent::NodeAdded { node: group, parent });
            for (position, (_, id)) in ordered.into_iter().enumerate() {
                Self::move_locked(&mut guard, id, group, position, &mut events)?;
            }
            guard.selection = vec![group];
            events.push(DocumentEvent::SelectionChanged);
            (group, events)
        };
        log::debug!("grouped selection into {group}");
        self.emit_all(events);
        Ok(group)
    }

    /// Dissolve the single selected container, splicing its children into
    /// its parent at its position. The children become the selection.
    pub fn ungroup_selected(&self) -> Result<Vec<NodeId>, ModelError> {
        let (children, events) = {
            let mut guard = self.write();
            let container = match guard.selection.as_slice() {
                [] => return Err(ModelError::EmptySelection),
                [single] => *single,
                _ => {
                    return Err(ModelError::InvalidSelection(
                        "ungrouping needs exactly one node".to_string(),
                    ));
                }
            };
            if !guard.arena.is_container(container) {
                return Err(ModelError::NotAContainer(container));
            }
            let parent = guard
                .arena
                .parent(container)
                .ok_or(ModelError::RootNotRemovable)?;
            let index = guard
                .arena
                .children(parent)
                .iter()
                .position(|c| *c == container)
                .unwrap_or(0);

            let mut events = Vec::new();
            let children = guard.arena.children(container);
            for (offset, child) in children.iter().enumerate() {
                Self::move_locked(&mut guard, *child, parent, index + offset, &mut events)?;
            }
            guard.arena.detach(container);
            guard.arena.drop_subtree(container);
            events.push(DocumentEvent::NodeRemoved {
                node: container,
                parent,
            });
            guard.selection = children.clone();
            events.push(DocumentEvent::SelectionChanged);
            (children, events)
        };
        log::debug!("ungrouped into {} node(s)", children.len());
        self.emit_all(events);
        Ok(children)
    }
}
