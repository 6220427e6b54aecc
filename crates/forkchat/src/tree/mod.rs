//! Branching conversation tree.
//!
//! Dialogue is stored as a forest of [`Message`] nodes instead of a flat
//! transcript. Editing a turn adds a sibling branch, regenerating a reply adds
//! a sibling reply, and deleting a turn repairs the displayed path. Nothing is
//! overwritten in place.
//!
//! All nodes live in a single arena keyed by [`MessageId`]; parent and child
//! links are ids into that arena. The "conversation" shown to the user and
//! sent to the model is the **active path**: starting at each active root,
//! follow the single active child at every level ([`ConversationTree::active_path`]).
//!
//! Every traversal uses an explicit work-list, so adversarially deep trees
//! cannot exhaust the call stack.
//!
//! # Example
//!
//! ```
//! use forkchat::tree::{ConversationTree, Message};
//!
//! let mut tree = ConversationTree::new();
//! tree.insert(Message::user("Hi"));
//! let hello = tree.insert(Message::assistant("Hello"));
//! tree.insert(Message::user("How are you?"));
//!
//! let edited = tree.edit(hello, "Hey there!");
//! let path: Vec<&str> = tree.active_path().map(|m| m.content.as_str()).collect();
//! assert_eq!(path, ["Hi", "Hey there!"]);
//! assert!(tree.get_siblings(edited).contains(&hello));
//! ```

mod message;
mod navigation;
mod validate;

pub use message::{Message, MessageId, Role};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Arena-backed forest of conversation turns.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ConversationTree {
    messages: HashMap<MessageId, Message>,
    roots: Vec<MessageId>,
}

/// What a [`ConversationTree::delete`] call did to the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Every message removed from the arena, the target included.
    pub removed: Vec<MessageId>,
    /// Same-role sibling activated in place of the deleted active message.
    pub replacement: Option<MessageId>,
    /// Active descendants that were relocated instead of deleted.
    pub rescued: Vec<MessageId>,
}

impl ConversationTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.contains_key(&id)
    }

    /// Root ids in display order.
    pub fn roots(&self) -> &[MessageId] {
        &self.roots
    }

    /// All messages, in no particular order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Toggle the display-only hidden flag. Returns `false` for unknown ids.
    pub fn set_hidden(&mut self, id: MessageId, hidden: bool) -> bool {
        match self.messages.get_mut(&id) {
            Some(msg) => {
                msg.is_hidden = hidden;
                true
            }
            None => {
                warn!(message_id = %id, "set_hidden: message not found");
                false
            }
        }
    }

    // ── Insertion ──────────────────────────────────────────────────

    /// Insert a new message, placing it according to its role.
    ///
    /// A user message attaches under the last active assistant message of the
    /// active path, or becomes a new root on the first turn. An assistant
    /// message attaches under the last active user message; with no such
    /// message it becomes a new root rather than being dropped.
    ///
    /// If the chosen parent already has an active child (a retried or
    /// regenerated turn), that child's branch is deactivated so the new
    /// message takes its place on the active path. The old branch stays
    /// reachable through [`get_siblings`](Self::get_siblings).
    pub fn insert(&mut self, mut message: Message) -> MessageId {
        if self.messages.contains_key(&message.id) {
            warn!(message_id = %message.id, "insert: id already present, assigning a fresh one");
            message.id = MessageId::new();
        }
        message.children_ids.clear();

        let parent = match message.role {
            Role::User => self.last_active(Role::Assistant),
            Role::Assistant => {
                let parent = self.last_active(Role::User);
                if parent.is_none() {
                    warn!(
                        message_id = %message.id,
                        "insert: no active user message to answer, attaching assistant message as a root"
                    );
                }
                parent
            }
        };

        if message.is_active {
            let displaced: Vec<MessageId> = self
                .list(parent)
                .iter()
                .copied()
                .filter(|c| self.messages.get(c).is_some_and(|m| m.is_active))
                .collect();
            // Roots may legitimately hold several active paths.
            if parent.is_some() {
                for child in displaced {
                    debug!(message_id = %child, "insert: demoting previously active branch");
                    self.set_branch_active(child, false);
                }
            }
        }

        let id = message.id;
        message.parent_id = parent;
        message.sibling_index = self.list(parent).len();
        debug!(
            message_id = %id,
            role = %message.role,
            parent = ?parent,
            sibling_index = message.sibling_index,
            "insert"
        );
        self.messages.insert(id, message);
        if let Some(list) = self.list_mut(parent) {
            list.push(id);
        }
        id
    }

    // ── Editing ────────────────────────────────────────────────────

    /// Edit a message by branching: a new sibling carrying `new_content` is
    /// placed right after the original and becomes the active branch at that
    /// position. The original and its whole subtree are deactivated but kept.
    /// Ancestors are activated and competing siblings (other roots, for a
    /// root edit) deactivated, so the edit is what the next reply answers.
    ///
    /// Returns the new message's id, or `message_id` unchanged if it is
    /// unknown.
    pub fn edit(&mut self, message_id: MessageId, new_content: impl Into<String>) -> MessageId {
        let Some(original) = self.messages.get(&message_id) else {
            warn!(message_id = %message_id, "edit: message not found");
            return message_id;
        };

        let mut edited = Message::new(original.role, new_content);
        edited.parent_id = original.parent_id;
        edited.sibling_index = original.sibling_index + 1;
        let parent = original.parent_id;
        let new_id = edited.id;

        self.set_branch_active(message_id, false);
        self.messages.insert(new_id, edited);

        if let Some(list) = self.list_mut(parent) {
            let position = list
                .iter()
                .position(|c| *c == message_id)
                .map_or(list.len(), |p| p + 1);
            list.insert(position, new_id);
        }
        self.renumber(parent);
        self.activate_path_to(new_id);

        debug!(original = %message_id, edited = %new_id, "edit: created branch");
        new_id
    }

    // ── Deletion ───────────────────────────────────────────────────

    /// Delete a message together with its inactive descendants.
    ///
    /// When the target was active, the first remaining same-role sibling (or
    /// root) is activated along its first-active-or-first descendant chain.
    /// Active descendants are never deleted: before the deletion walk descends
    /// past one, it is rescued. The first rescued branch moves under the
    /// activated sibling so the conversation continues; any other (or, with no
    /// sibling, every) rescued branch becomes an inactive root, and the active
    /// path ends at the deleted message's parent.
    ///
    /// Returns `None` if the id is unknown.
    pub fn delete(&mut self, message_id: MessageId) -> Option<DeleteOutcome> {
        let Some(target) = self.messages.get(&message_id) else {
            warn!(message_id = %message_id, "delete: message not found");
            return None;
        };
        let was_active = target.is_active;
        let role = target.role;
        let parent = target.parent_id;
        debug!(
            message_id = %message_id,
            children = target.children_ids.len(),
            was_active,
            "delete: {}",
            target.preview()
        );

        self.detach(message_id);

        let mut outcome = DeleteOutcome::default();
        if was_active {
            let replacement = self
                .list(parent)
                .iter()
                .copied()
                .find(|id| self.messages.get(id).is_some_and(|m| m.role == role));
            if let Some(sibling) = replacement
                && let Some(msg) = self.messages.get_mut(&sibling)
            {
                msg.is_active = true;
                debug!(message_id = %sibling, "delete: activated sibling in place of deleted message");
                outcome.replacement = Some(sibling);
            }
        }

        let mut rescue_parent = outcome.replacement;
        let mut stack: Vec<MessageId> = self
            .messages
            .get(&message_id)
            .map(|m| m.children_ids.iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(node) = stack.pop() {
            let Some(msg) = self.messages.get(&node) else {
                continue;
            };
            if msg.is_active {
                self.rescue(node, rescue_parent.take());
                outcome.rescued.push(node);
                continue;
            }
            stack.extend(msg.children_ids.iter().rev().copied());
            trace!(message_id = %node, "delete: removing inactive descendant");
            self.messages.remove(&node);
            outcome.removed.push(node);
        }

        self.messages.remove(&message_id);
        outcome.removed.push(message_id);

        if let Some(sibling) = outcome.replacement {
            self.activate_descendants(sibling);
        }

        debug!(
            removed = outcome.removed.len(),
            rescued = outcome.rescued.len(),
            remaining = self.messages.len(),
            "delete: complete"
        );
        Some(outcome)
    }

    /// Relocate a branch whose ancestor is being deleted.
    fn rescue(&mut self, node: MessageId, new_parent: Option<MessageId>) {
        match new_parent {
            Some(parent) => {
                let competing = self
                    .list(Some(parent))
                    .iter()
                    .any(|c| self.messages.get(c).is_some_and(|m| m.is_active));
                self.relink(node, Some(parent));
                if competing {
                    self.set_branch_active(node, false);
                }
                debug!(message_id = %node, new_parent = %parent, "delete: rescued active branch under sibling");
            }
            None => {
                self.relink(node, None);
                self.set_branch_active(node, false);
                debug!(message_id = %node, "delete: rescued active branch as inactive root");
            }
        }
    }

    // ── Promotion ──────────────────────────────────────────────────

    /// Detach a message (with its subtree) from its parent and append it to
    /// the roots. Activation flags are left untouched.
    ///
    /// Returns `false` if the id is unknown or already a root.
    pub fn promote_to_root(&mut self, message_id: MessageId) -> bool {
        let Some(msg) = self.messages.get(&message_id) else {
            warn!(message_id = %message_id, "promote_to_root: message not found");
            return false;
        };
        if msg.is_root() {
            return false;
        }
        debug!(message_id = %message_id, "promote_to_root: {}", msg.preview());
        self.detach(message_id);
        self.relink(message_id, None);
        true
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Same-role messages sharing `message_id`'s parent, in display order, the
    /// message itself included. For a root, all root ids. Empty for unknown
    /// ids.
    pub fn get_siblings(&self, message_id: MessageId) -> Vec<MessageId> {
        let Some(msg) = self.messages.get(&message_id) else {
            warn!(message_id = %message_id, "get_siblings: message not found");
            return Vec::new();
        };
        match msg.parent_id {
            None => self.roots.clone(),
            Some(parent) => self
                .list(Some(parent))
                .iter()
                .copied()
                .filter(|c| self.messages.get(c).is_some_and(|m| m.role == msg.role))
                .collect(),
        }
    }

    /// The displayed conversation: for each active root in order, the root
    /// followed by its chain of active children.
    ///
    /// The iterator is lazy and borrows the tree; call again to restart.
    pub fn active_path(&self) -> ActivePath<'_> {
        ActivePath {
            tree: self,
            next_root: 0,
            current: None,
            budget: self.messages.len(),
        }
    }

    /// First active child of `message_id`.
    pub fn active_child(&self, message_id: MessageId) -> Option<MessageId> {
        self.messages
            .get(&message_id)?
            .children_ids
            .iter()
            .copied()
            .find(|c| self.messages.get(c).is_some_and(|m| m.is_active))
    }

    fn last_active(&self, role: Role) -> Option<MessageId> {
        self.active_path()
            .filter(|m| m.role == role && m.is_active)
            .last()
            .map(|m| m.id)
    }

    // ── Structural helpers ─────────────────────────────────────────

    /// The sibling list a message with this parent belongs to.
    fn list(&self, parent: Option<MessageId>) -> &[MessageId] {
        match parent {
            Some(p) => self
                .messages
                .get(&p)
                .map(|m| m.children_ids.as_slice())
                .unwrap_or_default(),
            None => &self.roots,
        }
    }

    fn list_mut(&mut self, parent: Option<MessageId>) -> Option<&mut Vec<MessageId>> {
        match parent {
            Some(p) => self.messages.get_mut(&p).map(|m| &mut m.children_ids),
            None => Some(&mut self.roots),
        }
    }

    fn renumber(&mut self, parent: Option<MessageId>) {
        let ids = self.list(parent).to_vec();
        for (index, id) in ids.iter().enumerate() {
            if let Some(msg) = self.messages.get_mut(id) {
                msg.sibling_index = index;
            }
        }
    }

    /// Remove `id` from its current sibling list. `parent_id` is left for the
    /// caller to rewrite.
    fn detach(&mut self, id: MessageId) {
        let Some(parent) = self.messages.get(&id).map(|m| m.parent_id) else {
            return;
        };
        if let Some(list) = self.list_mut(parent) {
            list.retain(|c| *c != id);
        }
        self.renumber(parent);
    }

    /// Append an already-detached `id` to `parent`'s children (or the roots).
    fn relink(&mut self, id: MessageId, parent: Option<MessageId>) {
        let index = self.list(parent).len();
        if let Some(list) = self.list_mut(parent) {
            list.push(id);
        }
        if let Some(msg) = self.messages.get_mut(&id) {
            msg.parent_id = parent;
            msg.sibling_index = index;
        }
    }

    fn set_branch_active(&mut self, id: MessageId, active: bool) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(msg) = self.messages.get_mut(&node) {
                msg.is_active = active;
                stack.extend(msg.children_ids.iter().copied());
            }
        }
    }

    /// Walk down from `id`, at each level keeping the first active child or
    /// activating the first child when none is active.
    fn activate_descendants(&mut self, id: MessageId) {
        let mut current = id;
        for _ in 0..self.messages.len() {
            let next = match self.active_child(current) {
                Some(child) => child,
                None => {
                    let Some(&first) = self.messages.get(&current).and_then(|m| m.children_ids.first())
                    else {
                        return;
                    };
                    if let Some(msg) = self.messages.get_mut(&first) {
                        msg.is_active = true;
                    }
                    first
                }
            };
            current = next;
        }
    }

    /// Make `id` active and climb towards the root, deactivating competing
    /// siblings at every level, until an already-active ancestor is reached.
    fn activate_path_to(&mut self, id: MessageId) {
        let mut current = id;
        for _ in 0..=self.messages.len() {
            let Some(parent) = self.messages.get(&current).map(|m| m.parent_id) else {
                return;
            };
            let competing: Vec<MessageId> = self
                .list(parent)
                .iter()
                .copied()
                .filter(|c| *c != current && self.messages.get(c).is_some_and(|m| m.is_active))
                .collect();
            for sibling in competing {
                self.set_branch_active(sibling, false);
            }
            if let Some(msg) = self.messages.get_mut(&current) {
                msg.is_active = true;
            }
            match parent {
                Some(p) if self.messages.get(&p).is_some_and(|m| !m.is_active) => current = p,
                _ => return,
            }
        }
    }
}

/// Lazy iterator over the active path. See [`ConversationTree::active_path`].
#[derive(Clone, Debug)]
pub struct ActivePath<'a> {
    tree: &'a ConversationTree,
    next_root: usize,
    current: Option<MessageId>,
    /// Upper bound on yielded items; a corrupted (cyclic) tree still terminates.
    budget: usize,
}

impl<'a> Iterator for ActivePath<'a> {
    type Item = &'a Message;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.budget == 0 {
                return None;
            }
            if let Some(id) = self.current.take() {
                let msg = self.tree.messages.get(&id)?;
                self.current = self.tree.active_child(id);
                self.budget -= 1;
                return Some(msg);
            }
            let root = *self.tree.roots.get(self.next_root)?;
            self.next_root += 1;
            if self.tree.messages.get(&root).is_some_and(|m| m.is_active) {
                self.current = Some(root);
            }
        }
    }
}
