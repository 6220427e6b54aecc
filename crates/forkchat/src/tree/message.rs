//! Message nodes stored in the [`ConversationTree`](super::ConversationTree).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a message node. Generated at creation, never reused.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Author of a conversation turn.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversation turn and its structural links.
///
/// Links are ids into the owning tree's arena, never references. Only the
/// tree mutates the structural fields; callers construct messages with
/// [`Message::user`] / [`Message::assistant`] and hand them to
/// [`ConversationTree::insert`](super::ConversationTree::insert).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub parent_id: Option<MessageId>,
    /// Insertion order is display order.
    pub children_ids: Vec<MessageId>,
    /// Dense position within the parent's children (or within the roots).
    pub sibling_index: usize,
    /// Whether this node lies on the displayed conversation path.
    pub is_active: bool,
    /// Display-only suppression flag; the tree never reads it.
    #[serde(default)]
    pub is_hidden: bool,
}

impl Message {
    /// Create a detached, active message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self::with_timestamp(role, content, Utc::now())
    }

    /// Create a detached, active message with an explicit timestamp.
    pub fn with_timestamp(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp,
            parent_id: None,
            children_ids: Vec::new(),
            sibling_index: 0,
            is_active: true,
            is_hidden: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// First ~30 characters of the content, for log lines.
    pub(crate) fn preview(&self) -> String {
        let mut preview: String = self.content.chars().take(30).collect();
        if self.content.chars().nth(30).is_some() {
            preview.push_str("...");
        }
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_start_detached_and_active() {
        let msg = Message::user("hello");
        assert_eq!(msg.role, Role::User);
        assert!(msg.is_root());
        assert!(msg.is_active);
        assert!(!msg.is_hidden);
        assert!(msg.children_ids.is_empty());
        assert_eq!(msg.sibling_index, 0);
    }

    #[test]
    fn ids_are_unique() {
        let a = Message::assistant("a");
        let b = Message::assistant("a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(Role::User.to_string(), "user");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let msg = Message::user("é".repeat(40));
        let preview = msg.preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 33);
        assert_eq!(Message::user("short").preview(), "short");
    }
}
