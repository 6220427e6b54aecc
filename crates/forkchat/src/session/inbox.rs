//! Hand-off of finished completions from request tasks to the session owner.
//!
//! Request tasks hold a [`CompletionSender`] and never touch the tree. The
//! task that owns the [`ChatSession`] drains the [`CompletionInbox`] between
//! user actions, so every tree mutation happens on one owner.
//!
//! ```
//! use forkchat::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut session = ChatSession::new(ModelSettings::default(), &ContextSizeTable::default());
//! let (sender, mut inbox) = CompletionInbox::new();
//!
//! session.send_user("Hi");
//! let request = session.request_window();
//! tokio::spawn(async move {
//!     // ... send `request` to the provider ...
//!     let _ = request;
//!     sender.finished("Hello");
//! });
//!
//! let id = inbox.recv_into(&mut session).await;
//! assert!(id.is_some());
//! assert_eq!(session.transcript().len(), 2);
//! # }
//! ```

use super::ChatSession;
use crate::tree::MessageId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// How a request ended.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    Finished,
    /// Stopped by the user; the content is whatever had streamed so far.
    Cancelled,
}

/// Assistant text produced by a background request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub outcome: CompletionOutcome,
}

impl Completion {
    pub fn finished(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            outcome: CompletionOutcome::Finished,
        }
    }

    pub fn cancelled(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            outcome: CompletionOutcome::Cancelled,
        }
    }
}

/// Sending half, cloned into each request task.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<Completion>,
}

impl CompletionSender {
    /// Deliver a completion. Returns `false` if the inbox is gone.
    pub fn send(&self, completion: Completion) -> bool {
        if self.tx.send(completion).is_err() {
            warn!("completion dropped: inbox closed");
            return false;
        }
        true
    }

    pub fn finished(&self, content: impl Into<String>) -> bool {
        self.send(Completion::finished(content))
    }

    pub fn cancelled(&self, content: impl Into<String>) -> bool {
        self.send(Completion::cancelled(content))
    }
}

/// Receiving half, held by the session owner.
#[derive(Debug)]
pub struct CompletionInbox {
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl CompletionInbox {
    pub fn new() -> (CompletionSender, CompletionInbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (CompletionSender { tx }, CompletionInbox { rx })
    }

    /// Insert every completion already waiting, without blocking. Returns
    /// the ids of the inserted assistant messages in arrival order.
    pub fn drain_into(&mut self, session: &mut ChatSession) -> Vec<MessageId> {
        let mut inserted = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            inserted.push(accept(session, completion));
        }
        inserted
    }

    /// Wait for the next completion and insert it. `None` once every sender
    /// has been dropped and the inbox is empty.
    pub async fn recv_into(&mut self, session: &mut ChatSession) -> Option<MessageId> {
        let completion = self.rx.recv().await?;
        Some(accept(session, completion))
    }
}

fn accept(session: &mut ChatSession, completion: Completion) -> MessageId {
    let id = session.accept_reply(completion.content);
    debug!(message_id = %id, outcome = ?completion.outcome, "completion accepted");
    id
}
