//! Context window budgeting: picks the longest trailing run of messages that
//! fits the model's context window after reserving room for the system
//! personality and the response.
//!
//! Token counts are a fixed heuristic (four characters per token, rounded
//! down), not a tokenizer. The numbers must stay stable, so the heuristic and
//! the fixed overheads below are part of the contract.

use crate::ChatRecord;
use crate::tree::Message;
use serde::Serialize;
use tracing::debug;

/// Characters per token in the estimate.
pub const CHARS_PER_TOKEN: usize = 4;

/// Fixed per-message overhead for role and formatting markup.
pub const PER_MESSAGE_OVERHEAD_TOKENS: usize = 20;

/// Safety buffer added to the reserved tokens.
pub const RESERVE_BUFFER_TOKENS: usize = 100;

/// Anything with text content that counts against the context window.
pub trait TokenWeighted {
    fn text(&self) -> &str;
}

impl TokenWeighted for Message {
    fn text(&self) -> &str {
        &self.content
    }
}

impl TokenWeighted for &Message {
    fn text(&self) -> &str {
        &self.content
    }
}

impl TokenWeighted for ChatRecord {
    fn text(&self) -> &str {
        &self.content
    }
}

impl TokenWeighted for String {
    fn text(&self) -> &str {
        self
    }
}

impl TokenWeighted for &str {
    fn text(&self) -> &str {
        self
    }
}

/// Estimate the token count of `text`: characters divided by four, rounded
/// down.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Cost of one message in the window, overhead included.
pub fn message_tokens<T: TokenWeighted + ?Sized>(message: &T) -> usize {
    estimate_tokens(message.text()) + PER_MESSAGE_OVERHEAD_TOKENS
}

/// Keep the longest suffix of `messages` that fits the context window.
///
/// Reserves `max_response_tokens + estimate_tokens(personality) + 100`. When
/// nothing is left for history, only the most recent message is returned
/// (or nothing, for an empty input). Otherwise messages are accepted from
/// newest to oldest until the first one that would overflow; order is
/// preserved and no message is partially included.
pub fn truncate<'a, T: TokenWeighted>(
    messages: &'a [T],
    personality: &str,
    context_size: usize,
    max_response_tokens: usize,
) -> &'a [T] {
    ContextBudget::new(context_size)
        .with_max_response_tokens(max_response_tokens)
        .with_personality(personality)
        .fit(messages)
}

/// A context window with its reserved overhead.
///
/// # Example
///
/// ```
/// use forkchat::context::ContextBudget;
///
/// let budget = ContextBudget::new(4096)
///     .with_max_response_tokens(512)
///     .with_personality("You are a terse assistant.");
///
/// let history = ["first question", "first answer", "second question"];
/// let window = budget.fit(&history);
/// assert_eq!(window.len(), 3);
/// println!("{}", budget.usage(window).to_log_string());
/// ```
#[derive(Debug, Clone)]
pub struct ContextBudget {
    /// Total context window in tokens.
    context_size: usize,
    /// Tokens reserved for the model's reply.
    max_response_tokens: usize,
    /// Estimated tokens of the system personality text.
    personality_tokens: usize,
}

impl ContextBudget {
    pub fn new(context_size: usize) -> Self {
        Self {
            context_size,
            max_response_tokens: 0,
            personality_tokens: 0,
        }
    }

    /// Reserve room for the reply (the request's `max_tokens`).
    pub fn with_max_response_tokens(mut self, tokens: usize) -> Self {
        self.max_response_tokens = tokens;
        self
    }

    /// Reserve room for the system personality sent with every request.
    pub fn with_personality(mut self, personality: &str) -> Self {
        self.personality_tokens = estimate_tokens(personality);
        self
    }

    pub fn context_size(&self) -> usize {
        self.context_size
    }

    /// Response reserve + personality + fixed buffer.
    /// Saturates at `usize::MAX`.
    pub fn reserved(&self) -> usize {
        self.max_response_tokens
            .saturating_add(self.personality_tokens)
            .saturating_add(RESERVE_BUFFER_TOKENS)
    }

    /// Tokens left for conversation history. May be zero or negative when
    /// the reserve alone exceeds the window; clamped to the `i64` range.
    pub fn available(&self) -> i64 {
        let available = self.context_size as i128 - self.reserved() as i128;
        i64::try_from(available).unwrap_or(if available > 0 { i64::MAX } else { i64::MIN })
    }

    /// The longest trailing slice of `messages` that fits [`available`](Self::available).
    pub fn fit<'a, T: TokenWeighted>(&self, messages: &'a [T]) -> &'a [T] {
        let available = self.available();
        if available <= 0 {
            debug!(
                context_size = self.context_size,
                reserved = self.reserved(),
                "context budget exhausted, keeping only the latest message"
            );
            return &messages[messages.len().saturating_sub(1)..];
        }

        let available = usize::try_from(available).unwrap_or(usize::MAX);
        let mut used: usize = 0;
        let mut start = messages.len();
        for message in messages.iter().rev() {
            let cost = message_tokens(message);
            if used.saturating_add(cost) > available {
                break;
            }
            used += cost;
            start -= 1;
        }

        if start > 0 {
            debug!(
                dropped = start,
                kept = messages.len() - start,
                used,
                available,
                "trimmed conversation to fit context window"
            );
        }
        &messages[start..]
    }

    /// Estimate how much of the window `messages` (plus the reserve) would use.
    pub fn usage<T: TokenWeighted>(&self, messages: &[T]) -> ContextUsage {
        let history_tokens = messages
            .iter()
            .map(message_tokens)
            .fold(0usize, usize::saturating_add);
        let estimated_tokens = history_tokens.saturating_add(self.reserved());
        let usage_pct = if self.context_size > 0 {
            estimated_tokens as f64 / self.context_size as f64
        } else {
            1.0
        };
        ContextUsage {
            message_count: messages.len(),
            history_tokens,
            estimated_tokens,
            context_size: self.context_size,
            usage_pct,
        }
    }
}

/// Snapshot of context usage for a request window.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ContextUsage {
    pub message_count: usize,
    /// Tokens of the messages themselves, per-message overhead included.
    pub history_tokens: usize,
    /// History plus reserve.
    pub estimated_tokens: usize,
    pub context_size: usize,
    /// Usage as a fraction (0.0 to 1.0+).
    pub usage_pct: f64,
}

impl ContextUsage {
    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: {} messages, ~{} tokens ({:.0}% of {})",
            self.message_count,
            self.estimated_tokens,
            self.usage_pct * 100.0,
            self.context_size,
        )
    }
}
