//! The chat loop around a [`ConversationTree`].
//!
//! A [`ChatSession`] owns one tree plus the model settings it talks to, and
//! runs the turn cycle: the user's message goes into the tree, the active
//! path is trimmed to the model's window, the trimmed records go out to the
//! request layer, and the reply comes back in as an assistant message.
//!
//! Requests run elsewhere (usually on a tokio task). Their replies are handed
//! back through the [`inbox`] channel so that only the session owner ever
//! mutates the tree.

pub mod inbox;

pub use inbox::{Completion, CompletionInbox, CompletionOutcome, CompletionSender};

use crate::ChatRecord;
use crate::config::ModelSettings;
use crate::context::{ContextBudget, ContextSizeTable, ContextUsage};
use crate::tree::{ConversationTree, DeleteOutcome, Message, MessageId};
use tracing::debug;

/// A conversation tree bound to one model configuration.
#[derive(Debug, Clone)]
pub struct ChatSession {
    tree: ConversationTree,
    settings: ModelSettings,
    budget: ContextBudget,
}

impl ChatSession {
    /// Start an empty session. The context size is resolved once, here.
    pub fn new(settings: ModelSettings, table: &ContextSizeTable) -> Self {
        Self::with_tree(ConversationTree::new(), settings, table)
    }

    /// Resume a session over an existing tree.
    pub fn with_tree(tree: ConversationTree, settings: ModelSettings, table: &ContextSizeTable) -> Self {
        let budget = settings.budget(table);
        debug!(
            model = %settings.model,
            context_size = budget.context_size(),
            max_tokens = settings.max_tokens,
            messages = tree.len(),
            "session started"
        );
        Self {
            tree,
            settings,
            budget,
        }
    }

    pub fn tree(&self) -> &ConversationTree {
        &self.tree
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn context_size(&self) -> usize {
        self.budget.context_size()
    }

    /// Budget every request window is trimmed to.
    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    pub fn into_tree(self) -> ConversationTree {
        self.tree
    }

    // ── Turn cycle ─────────────────────────────────────────────────

    /// Append the user's next message to the active path.
    pub fn send_user(&mut self, content: impl Into<String>) -> MessageId {
        self.tree.insert(Message::user(content))
    }

    /// Append an assistant reply. Partial text from a cancelled request is
    /// accepted like any other reply.
    pub fn accept_reply(&mut self, content: impl Into<String>) -> MessageId {
        self.tree.insert(Message::assistant(content))
    }

    /// The whole active path as request records, untrimmed.
    pub fn transcript(&self) -> Vec<ChatRecord> {
        self.tree.active_path().map(ChatRecord::from).collect()
    }

    /// The active path trimmed to the model's context window.
    pub fn request_window(&self) -> Vec<ChatRecord> {
        let path: Vec<&Message> = self.tree.active_path().collect();
        let window = self.budget.fit(&path);
        debug!("{}", self.budget.usage(window).to_log_string());
        window.iter().map(|m| ChatRecord::from(*m)).collect()
    }

    /// Context usage of the window [`request_window`](Self::request_window)
    /// would send.
    pub fn usage(&self) -> ContextUsage {
        let path: Vec<&Message> = self.tree.active_path().collect();
        self.budget.usage(self.budget.fit(&path))
    }

    // ── Branching ──────────────────────────────────────────────────

    pub fn edit(&mut self, message_id: MessageId, new_content: impl Into<String>) -> MessageId {
        self.tree.edit(message_id, new_content)
    }

    pub fn delete(&mut self, message_id: MessageId) -> Option<DeleteOutcome> {
        self.tree.delete(message_id)
    }

    pub fn navigate_sibling(&mut self, message_id: MessageId, step: isize) -> Option<MessageId> {
        self.tree.navigate_sibling(message_id, step)
    }

    pub fn switch_to(&mut self, message_id: MessageId) -> bool {
        self.tree.switch_to(message_id)
    }

    pub fn promote_to_root(&mut self, message_id: MessageId) -> bool {
        self.tree.promote_to_root(message_id)
    }
}
