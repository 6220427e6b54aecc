//! Context window management: token estimates, the trailing-window budget,
//! and per-model context sizes.
//!
//! 1. **[`budget`]**: [`ContextBudget`] and [`truncate`] keep the longest
//!    run of recent messages that fits once the response and personality
//!    reserves are taken out.
//!
//! 2. **[`models`]**: [`ContextSizeTable`] resolves a model name to its
//!    context window with ordered, fuzzy matching.

pub mod budget;
pub mod models;

pub use budget::{
    ContextBudget, ContextUsage, TokenWeighted, estimate_tokens, message_tokens, truncate,
};
pub use models::{ContextSizeTable, DEFAULT_CONTEXT_SIZE, ModelContextEntry, context_size_for_model};
