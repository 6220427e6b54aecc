//! Sibling navigation: the "‹ 2/3 ›" controls next to an edited or
//! regenerated message.

use super::{ConversationTree, MessageId};
use tracing::{debug, warn};

impl ConversationTree {
    /// Zero-based position of `message_id` among its siblings and the sibling
    /// count, as returned by [`get_siblings`](Self::get_siblings).
    pub fn sibling_position(&self, message_id: MessageId) -> Option<(usize, usize)> {
        let siblings = self.get_siblings(message_id);
        let position = siblings.iter().position(|id| *id == message_id)?;
        Some((position, siblings.len()))
    }

    /// Display the branch containing `message_id`.
    ///
    /// Ancestors are activated, competing siblings along the way are
    /// deactivated with their subtrees, and below `message_id` the
    /// first-active-or-first child chain is activated. Returns `false` for
    /// unknown ids.
    pub fn switch_to(&mut self, message_id: MessageId) -> bool {
        if !self.contains(message_id) {
            warn!(message_id = %message_id, "switch_to: message not found");
            return false;
        }
        self.activate_path_to(message_id);
        self.activate_descendants(message_id);
        debug!(message_id = %message_id, "switch_to: branch now active");
        true
    }

    /// Move the displayed branch `step` siblings away from `message_id`
    /// (negative steps go left). The target is clamped to the sibling range.
    ///
    /// Returns the newly displayed sibling, or `None` if the id is unknown or
    /// the move would not change anything.
    pub fn navigate_sibling(&mut self, message_id: MessageId, step: isize) -> Option<MessageId> {
        let siblings = self.get_siblings(message_id);
        let position = siblings.iter().position(|id| *id == message_id)?;
        let target_index = position
            .saturating_add_signed(step)
            .min(siblings.len().saturating_sub(1));
        if target_index == position {
            return None;
        }
        let target = siblings[target_index];
        self.switch_to(target);
        Some(target)
    }

    /// Whether any node below `message_id` is active.
    pub fn has_active_descendants(&self, message_id: MessageId) -> bool {
        let Some(msg) = self.get(message_id) else {
            return false;
        };
        let mut stack = msg.children_ids.clone();
        while let Some(node) = stack.pop() {
            if let Some(child) = self.get(node) {
                if child.is_active {
                    return true;
                }
                stack.extend(child.children_ids.iter().copied());
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::{ConversationTree, Message, MessageId};

    fn contents(tree: &ConversationTree) -> Vec<String> {
        tree.active_path().map(|m| m.content.clone()).collect()
    }

    fn with_three_replies() -> (ConversationTree, [MessageId; 3]) {
        let mut tree = ConversationTree::new();
        tree.insert(Message::user("Hi"));
        let a = tree.insert(Message::assistant("a"));
        let b = tree.insert(Message::assistant("b"));
        let c = tree.insert(Message::assistant("c"));
        (tree, [a, b, c])
    }

    #[test]
    fn position_counts_siblings() {
        let (tree, [a, b, c]) = with_three_replies();
        assert_eq!(tree.sibling_position(a), Some((0, 3)));
        assert_eq!(tree.sibling_position(b), Some((1, 3)));
        assert_eq!(tree.sibling_position(c), Some((2, 3)));
        assert_eq!(tree.sibling_position(MessageId::new()), None);
    }

    #[test]
    fn navigate_left_and_right() {
        let (mut tree, [a, b, c]) = with_three_replies();
        assert_eq!(contents(&tree), ["Hi", "c"]);

        assert_eq!(tree.navigate_sibling(c, -1), Some(b));
        assert_eq!(contents(&tree), ["Hi", "b"]);
        assert!(!tree.get(c).unwrap().is_active);

        assert_eq!(tree.navigate_sibling(b, -5), Some(a));
        assert_eq!(contents(&tree), ["Hi", "a"]);
        tree.validate().unwrap();
    }

    #[test]
    fn navigate_past_the_edge_is_noop() {
        let (mut tree, [a, _, c]) = with_three_replies();
        assert_eq!(tree.navigate_sibling(c, 1), None);
        assert_eq!(tree.navigate_sibling(c, 0), None);
        tree.switch_to(a);
        assert_eq!(tree.navigate_sibling(a, -1), None);
        assert_eq!(tree.navigate_sibling(MessageId::new(), 1), None);
    }

    #[test]
    fn switching_back_restores_the_old_branch_tail() {
        let mut tree = ConversationTree::new();
        tree.insert(Message::user("Hi"));
        let hello = tree.insert(Message::assistant("Hello"));
        tree.insert(Message::user("How are you?"));
        let edited = tree.edit(hello, "Hey there!");
        assert_eq!(contents(&tree), ["Hi", "Hey there!"]);

        assert_eq!(tree.navigate_sibling(edited, -1), Some(hello));
        assert_eq!(contents(&tree), ["Hi", "Hello", "How are you?"]);
        tree.validate().unwrap();
    }

    #[test]
    fn switch_to_deep_inactive_node_activates_ancestors() {
        let mut tree = ConversationTree::new();
        let hi = tree.insert(Message::user("Hi"));
        let hello = tree.insert(Message::assistant("Hello"));
        let how = tree.insert(Message::user("How are you?"));
        let fine = tree.insert(Message::assistant("Fine"));
        tree.edit(hi, "Yo");
        assert_eq!(contents(&tree), ["Yo"]);

        assert!(tree.switch_to(how));
        assert_eq!(contents(&tree), ["Hi", "Hello", "How are you?", "Fine"]);
        assert!(tree.get(hello).unwrap().is_active);
        assert!(tree.get(fine).unwrap().is_active);
        assert!(!tree.switch_to(MessageId::new()));
        tree.validate().unwrap();
    }

    #[test]
    fn active_descendant_query() {
        let mut tree = ConversationTree::new();
        let hi = tree.insert(Message::user("Hi"));
        let hello = tree.insert(Message::assistant("Hello"));
        assert!(tree.has_active_descendants(hi));
        assert!(!tree.has_active_descendants(hello));
        tree.edit(hello, "Hey");
        assert!(tree.has_active_descendants(hi));
        assert!(!tree.has_active_descendants(MessageId::new()));
        assert_eq!(tree.active_child(hi), tree.get(hi).unwrap().children_ids.get(1).copied());
    }
}
