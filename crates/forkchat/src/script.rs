//! Replay scripts for the `forkchat replay` command.
//!
//! A script is a JSON array of steps tagged by `op`. Steps that create a
//! message may carry a `label`; later steps refer to that message by label:
//!
//! ```json
//! [
//!   { "op": "user", "content": "Hi" },
//!   { "op": "assistant", "content": "Hello", "label": "hello" },
//!   { "op": "user", "content": "How are you?" },
//!   { "op": "edit", "target": "hello", "content": "Hey there!", "label": "hey" },
//!   { "op": "navigate", "target": "hey", "step": -1 }
//! ]
//! ```
//!
//! Assistant steps are delivered through a [`CompletionInbox`] the way a
//! live client receives replies from its request tasks.

use forkchat::error::ConfigError;
use forkchat::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    User {
        content: String,
        #[serde(default)]
        label: Option<String>,
    },
    Assistant {
        content: String,
        /// Record the reply as cut short by the user.
        #[serde(default)]
        cancelled: bool,
        #[serde(default)]
        label: Option<String>,
    },
    Edit {
        target: String,
        content: String,
        #[serde(default)]
        label: Option<String>,
    },
    Delete {
        target: String,
    },
    Promote {
        target: String,
    },
    Navigate {
        target: String,
        step: isize,
        #[serde(default)]
        label: Option<String>,
    },
}

/// Read a script file.
pub fn load_script(path: &Path) -> Result<Vec<Step>, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// A session being driven by a script.
pub struct Replay {
    session: ChatSession,
    inbox: CompletionInbox,
    replies: CompletionSender,
    labels: HashMap<String, MessageId>,
}

impl Replay {
    pub fn new(session: ChatSession) -> Self {
        let (replies, inbox) = CompletionInbox::new();
        Self {
            session,
            inbox,
            replies,
            labels: HashMap::new(),
        }
    }

    /// Apply every step, then check the tree's structure.
    pub fn run(&mut self, steps: &[Step]) -> Result<(), String> {
        for (index, step) in steps.iter().enumerate() {
            self.apply(step)
                .map_err(|e| format!("step {}: {e}", index + 1))?;
        }
        self.session
            .tree()
            .validate()
            .map_err(|e| format!("tree is inconsistent after replay: {e}"))
    }

    fn apply(&mut self, step: &Step) -> Result<(), String> {
        debug!(?step, "replay step");
        match step {
            Step::User { content, label } => {
                let id = self.session.send_user(content.as_str());
                self.remember(label, id);
            }
            Step::Assistant {
                content,
                cancelled,
                label,
            } => {
                let completion = if *cancelled {
                    Completion::cancelled(content.as_str())
                } else {
                    Completion::finished(content.as_str())
                };
                if !self.replies.send(completion) {
                    return Err("reply channel closed".to_string());
                }
                for id in self.inbox.drain_into(&mut self.session) {
                    self.remember(label, id);
                }
            }
            Step::Edit {
                target,
                content,
                label,
            } => {
                let original = self.resolve(target)?;
                let id = self.session.edit(original, content.as_str());
                self.remember(label, id);
            }
            Step::Delete { target } => {
                let id = self.resolve(target)?;
                let outcome = self
                    .session
                    .delete(id)
                    .ok_or_else(|| format!("'{target}' was already deleted"))?;
                self.labels.retain(|_, id| !outcome.removed.contains(id));
            }
            Step::Promote { target } => {
                let id = self.resolve(target)?;
                if !self.session.promote_to_root(id) {
                    debug!(label = %target, "promote: already a root");
                }
            }
            Step::Navigate {
                target,
                step,
                label,
            } => {
                let id = self.resolve(target)?;
                if let Some(shown) = self.session.navigate_sibling(id, *step) {
                    self.remember(label, shown);
                }
            }
        }
        Ok(())
    }

    fn remember(&mut self, label: &Option<String>, id: MessageId) {
        if let Some(label) = label {
            self.labels.insert(label.clone(), id);
        }
    }

    fn resolve(&self, label: &str) -> Result<MessageId, String> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| format!("unknown label '{label}'"))
    }

    pub fn report(&self) -> ReplayReport {
        let tree = self.session.tree();
        let names: HashMap<MessageId, &str> = self
            .labels
            .iter()
            .map(|(label, id)| (*id, label.as_str()))
            .collect();
        let active_path = tree
            .active_path()
            .map(|msg| {
                let (position, siblings) = tree.sibling_position(msg.id).unwrap_or((0, 1));
                PathEntry {
                    record: ChatRecord::from(msg),
                    position: position + 1,
                    siblings,
                    label: names.get(&msg.id).map(|l| l.to_string()),
                }
            })
            .collect();
        ReplayReport {
            model: self.session.settings().model.clone(),
            context_size: self.session.context_size(),
            messages: tree.len(),
            roots: tree.roots().len(),
            active_path,
            window: self.session.request_window(),
            usage: self.session.usage(),
        }
    }
}

/// One message of the active path with its sibling position (1-based).
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PathEntry {
    #[serde(flatten)]
    pub record: ChatRecord,
    pub position: usize,
    pub siblings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Final state after a replay.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub model: String,
    pub context_size: usize,
    pub messages: usize,
    pub roots: usize,
    pub active_path: Vec<PathEntry>,
    pub window: Vec<ChatRecord>,
    pub usage: ContextUsage,
}

impl ReplayReport {
    /// Human-readable rendering for the terminal.
    pub fn render(&self) -> String {
        let mut out = format!(
            "model: {} (context {} tokens)\ntree: {} messages, {} roots\n\nactive path:\n",
            self.model, self.context_size, self.messages, self.roots
        );
        for entry in &self.active_path {
            let nav = if entry.siblings > 1 {
                format!(" ‹{}/{}›", entry.position, entry.siblings)
            } else {
                String::new()
            };
            let label = entry
                .label
                .as_deref()
                .map(|l| format!(" #{l}"))
                .unwrap_or_default();
            out.push_str(&format!(
                "  [{}]{nav}{label} {}\n",
                entry.record.role, entry.record.content
            ));
        }
        let dropped = self.active_path.len().saturating_sub(self.window.len());
        out.push_str(&format!(
            "\nrequest window: {} ({} dropped)\n",
            self.usage.to_log_string(),
            dropped
        ));
        out
    }
}
