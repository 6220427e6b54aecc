//! Convenience re-exports for common `forkchat` types.
//!
//! ```
//! use forkchat::prelude::*;
//! ```
//!
//! Covers building and navigating a tree, budgeting a request, and running a
//! session. Validation errors and the budget constants stay in their modules.

// ── Tree ────────────────────────────────────────────────────────────
pub use crate::tree::{ConversationTree, DeleteOutcome, Message, MessageId, Role};

// ── Context ─────────────────────────────────────────────────────────
pub use crate::context::{ContextBudget, ContextSizeTable, ContextUsage, estimate_tokens, truncate};

// ── Session ─────────────────────────────────────────────────────────
pub use crate::ChatRecord;
pub use crate::config::{ForkchatConfig, ModelSettings};
pub use crate::session::{ChatSession, Completion, CompletionInbox, CompletionSender};
