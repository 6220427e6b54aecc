//! Branching conversation storage and context-window budgeting for chat
//! applications.
//!
//! `forkchat` keeps dialogue as a tree instead of a flat transcript, so that
//! editing, retrying, or regenerating any turn adds an alternate branch
//! rather than destroying history. The branch currently on screen is the
//! **active path**; before each model request it is trimmed to the longest
//! trailing window that fits the model's context.
//!
//! # Getting started
//!
//! ```
//! use forkchat::prelude::*;
//!
//! let settings = ModelSettings::new("gpt-4o").with_max_tokens(512);
//! let mut session = ChatSession::new(settings, &ContextSizeTable::default());
//!
//! session.send_user("Hi");
//! let hello = session.accept_reply("Hello");
//! session.send_user("How are you?");
//!
//! // Regenerate the first reply: the old one stays reachable as a sibling.
//! let hey = session.edit(hello, "Hey there!");
//! let window = session.request_window();
//! assert_eq!(window.len(), 2);
//! assert_eq!(window[1].content, "Hey there!");
//! assert_eq!(session.tree().sibling_position(hey), Some((1, 2)));
//! ```
//!
//! # Where to find things
//!
//! - **Store and branch a conversation:** [`ConversationTree`](tree::ConversationTree)
//!   with [`insert`](tree::ConversationTree::insert),
//!   [`edit`](tree::ConversationTree::edit),
//!   [`delete`](tree::ConversationTree::delete) and
//!   [`active_path`](tree::ConversationTree::active_path). Sibling
//!   navigation lives alongside (`sibling_position`, `navigate_sibling`,
//!   `switch_to`), and [`validate`](tree::ConversationTree::validate) checks
//!   every structural invariant.
//!
//! - **Fit history into a model's window:** [`context::truncate`] or the
//!   [`ContextBudget`](context::ContextBudget) builder, with
//!   [`ContextSizeTable`](context::ContextSizeTable) resolving model names to
//!   window sizes.
//!
//! - **Drive a chat loop:** [`ChatSession`](session::ChatSession) ties the
//!   tree to [`ModelSettings`](config::ModelSettings); background request
//!   tasks hand replies back through a
//!   [`CompletionInbox`](session::CompletionInbox).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`tree`] | Message arena, branching operations, navigation, validation |
//! | [`context`] | Token estimates, trailing-window budget, model context sizes |
//! | [`session`] | Single-owner chat session and completion hand-off |
//! | [`config`] | JSON-loadable model settings |
//! | [`error`] | [`TreeError`](error::TreeError), [`ConfigError`](error::ConfigError) |

pub mod config;
pub mod context;
pub mod error;
pub mod prelude;
pub mod session;
pub mod tree;

use serde::{Deserialize, Serialize};
use tree::{Message, Role};

// ── Request records ────────────────────────────────────────────────

/// A role/content pair ready to be formatted into a provider request.
///
/// This is what leaves the core: tree structure, ids and flags are dropped.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub role: Role,
    pub content: String,
}

impl ChatRecord {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatRecord {
    fn from(msg: &Message) -> Self {
        Self::new(msg.role, msg.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_role_and_content_only() {
        let msg = Message::assistant("Hello");
        let record = ChatRecord::from(&msg);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "Hello"}));
    }

    #[test]
    fn record_deserializes() {
        let record: ChatRecord =
            serde_json::from_str(r#"{"role":"user","content":"Hi"}"#).unwrap();
        assert_eq!(record, ChatRecord::new(Role::User, "Hi"));
    }
}
