//! Full structural consistency check.

use super::{ConversationTree, MessageId};
use crate::error::TreeError;
use std::collections::HashSet;

impl ConversationTree {
    /// Check every structural invariant: links resolve in both directions,
    /// sibling indices are dense, at most one active child per node, active
    /// nodes hang under active parents, and every message is reachable from
    /// exactly one root exactly once.
    ///
    /// A failure here means a bug in the tree (or a hand-edited snapshot),
    /// never bad caller input.
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut visited: HashSet<MessageId> = HashSet::with_capacity(self.messages.len());
        let mut stack: Vec<MessageId> = Vec::new();

        for (index, &root) in self.roots.iter().enumerate() {
            let msg = self.messages.get(&root).ok_or(TreeError::DanglingRoot(root))?;
            if msg.parent_id.is_some() {
                return Err(TreeError::ParentMismatch {
                    child: root,
                    listed_under: None,
                    parent_id: msg.parent_id,
                });
            }
            if msg.sibling_index != index {
                return Err(TreeError::SiblingIndex {
                    id: root,
                    expected: index,
                    found: msg.sibling_index,
                });
            }
            stack.push(root);
        }

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                return Err(TreeError::Cycle(node));
            }
            let Some(msg) = self.messages.get(&node) else {
                continue;
            };
            let mut active_children = 0;
            for (index, &child_id) in msg.children_ids.iter().enumerate() {
                let child = self.messages.get(&child_id).ok_or(TreeError::DanglingChild {
                    parent: node,
                    child: child_id,
                })?;
                if child.parent_id != Some(node) {
                    return Err(TreeError::ParentMismatch {
                        child: child_id,
                        listed_under: Some(node),
                        parent_id: child.parent_id,
                    });
                }
                if child.sibling_index != index {
                    return Err(TreeError::SiblingIndex {
                        id: child_id,
                        expected: index,
                        found: child.sibling_index,
                    });
                }
                if child.is_active {
                    if !msg.is_active {
                        return Err(TreeError::ActiveUnderInactive {
                            parent: node,
                            child: child_id,
                        });
                    }
                    active_children += 1;
                }
                stack.push(child_id);
            }
            if active_children > 1 {
                return Err(TreeError::MultipleActiveChildren {
                    parent: node,
                    count: active_children,
                });
            }
        }

        if let Some(orphan) = self.messages.keys().find(|id| !visited.contains(id)) {
            return Err(TreeError::Orphan(*orphan));
        }
        Ok(())
    }
}
