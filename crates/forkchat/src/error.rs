//! Error types.
//!
//! Unknown ids and exhausted budgets are ordinary input and never produce an
//! error. [`TreeError`] is reserved for broken structural invariants, which
//! indicate a bug rather than misuse.

use crate::tree::MessageId;
use std::path::PathBuf;

/// A structural invariant of the conversation tree does not hold.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("message {parent} lists unknown child {child}")]
    DanglingChild { parent: MessageId, child: MessageId },

    #[error("roots list unknown message {0}")]
    DanglingRoot(MessageId),

    #[error("message {child} is listed under {listed_under:?} but its parent_id is {parent_id:?}")]
    ParentMismatch {
        child: MessageId,
        listed_under: Option<MessageId>,
        parent_id: Option<MessageId>,
    },

    #[error("message {0} is not reachable from any root")]
    Orphan(MessageId),

    #[error("message {id} has sibling_index {found}, expected {expected}")]
    SiblingIndex {
        id: MessageId,
        expected: usize,
        found: usize,
    },

    #[error("message {parent} has {count} active children")]
    MultipleActiveChildren { parent: MessageId, count: usize },

    #[error("active message {child} sits under inactive parent {parent}")]
    ActiveUnderInactive { parent: MessageId, child: MessageId },

    #[error("message {0} is reachable twice (cycle or shared child)")]
    Cycle(MessageId),
}

/// Failure to load a configuration or replay script.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no model settings named '{0}'")]
    UnknownModel(String),
}
