//! Context window sizes for known models.
//!
//! Model names are matched loosely (`"gpt-4o-2024-08-06"` should resolve to
//! the `gpt-4o` entry), so the table is an ordered list rather than a map:
//! the first matching entry wins and entry order is part of the behavior.

use serde::{Deserialize, Serialize};

/// Context size used when nothing in a table matches.
pub const DEFAULT_CONTEXT_SIZE: usize = 4096;

/// One `pattern -> context size` entry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ModelContextEntry {
    pub pattern: String,
    pub context_size: usize,
}

/// Ordered lookup table from model-name patterns to context sizes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContextSizeTable {
    #[serde(default)]
    pub entries: Vec<ModelContextEntry>,
    #[serde(default = "default_context_size")]
    pub default: usize,
}

fn default_context_size() -> usize {
    DEFAULT_CONTEXT_SIZE
}

impl ContextSizeTable {
    /// A table with no entries; every lookup resolves to `default`.
    pub fn empty(default: usize) -> Self {
        Self {
            entries: Vec::new(),
            default,
        }
    }

    /// Append an entry. Entries added later only match when earlier ones don't.
    pub fn with_entry(mut self, pattern: impl Into<String>, context_size: usize) -> Self {
        self.entries.push(ModelContextEntry {
            pattern: pattern.into(),
            context_size,
        });
        self
    }

    /// Resolve a context size for `model_name`.
    ///
    /// Precedence: an entry whose pattern equals the name exactly; then the
    /// first entry, in table order, whose pattern is a substring of the
    /// lower-cased name or which contains the lower-cased name; then
    /// `default`.
    pub fn context_size_for(&self, model_name: &str) -> usize {
        if let Some(entry) = self.entries.iter().find(|e| e.pattern == model_name) {
            return entry.context_size;
        }
        let lowered = model_name.to_lowercase();
        self.entries
            .iter()
            .find(|e| lowered.contains(e.pattern.as_str()) || e.pattern.contains(lowered.as_str()))
            .map_or(self.default, |e| e.context_size)
    }
}

/// Free-function form of [`ContextSizeTable::context_size_for`].
pub fn context_size_for_model(model_name: &str, table: &ContextSizeTable) -> usize {
    table.context_size_for(model_name)
}

impl Default for ContextSizeTable {
    /// Well-known chat models. Longer, more specific names that share a
    /// prefix with a shorter one still lose to the earlier shorter entry on a
    /// fuzzy match (`gpt-4-turbo-preview` resolves through `gpt-4`); exact
    /// names always hit their own entry.
    fn default() -> Self {
        Self::empty(DEFAULT_CONTEXT_SIZE)
            // OpenAI
            .with_entry("gpt-3.5-turbo", 4096)
            .with_entry("gpt-3.5-turbo-16k", 16384)
            .with_entry("gpt-4", 8192)
            .with_entry("gpt-4-32k", 32768)
            .with_entry("gpt-4-turbo", 128_000)
            .with_entry("gpt-4o", 128_000)
            // Anthropic
            .with_entry("claude-3-haiku-20240307", 200_000)
            .with_entry("claude-3-sonnet-20240229", 200_000)
            .with_entry("claude-3-opus-20240229", 200_000)
            .with_entry("claude-3-5-sonnet-20241022", 200_000)
            // Google
            .with_entry("gemini-pro", 32768)
            .with_entry("gemini-1.5-pro", 1_000_000)
            .with_entry("gemini-1.5-flash", 1_000_000)
            // DeepSeek
            .with_entry("deepseek-chat", 32768)
            .with_entry("deepseek-coder", 16384)
            // Groq
            .with_entry("llama-3.1-8b-instant", 8192)
            .with_entry("llama-3.1-70b-versatile", 8192)
            .with_entry("mixtral-8x7b-32768", 32768)
            // Local / other
            .with_entry("local-model", 4096)
            .with_entry("llama-2-7b-chat", 4096)
            .with_entry("llama-2-70b-chat", 4096)
            .with_entry("codellama", 16384)
            .with_entry("mistral", 8192)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_wins_over_earlier_fuzzy_match() {
        let table = ContextSizeTable::default();
        assert_eq!(table.context_size_for("gpt-4o"), 128_000);
        assert_eq!(table.context_size_for("gpt-4-32k"), 32768);
        assert_eq!(table.context_size_for("gpt-3.5-turbo-16k"), 16384);
    }

    #[test]
    fn fuzzy_match_follows_table_order() {
        let table = ContextSizeTable::default();
        // "gpt-4" is listed before "gpt-4o" and is a substring of the name.
        assert_eq!(table.context_size_for("openai/gpt-4o-mini"), 8192);
        assert_eq!(table.context_size_for("GPT-3.5-Turbo-0613"), 4096);
        assert_eq!(table.context_size_for("mistral-large-latest"), 8192);
    }

    #[test]
    fn name_contained_in_pattern_matches() {
        let table = ContextSizeTable::default();
        assert_eq!(table.context_size_for("Gemini-1.5"), 1_000_000);
        assert_eq!(table.context_size_for("deepseek"), 32768);
    }

    #[test]
    fn unknown_model_uses_default() {
        let table = ContextSizeTable::default();
        assert_eq!(table.context_size_for("totally-unknown-xyz"), DEFAULT_CONTEXT_SIZE);
        let custom = ContextSizeTable::empty(2048);
        assert_eq!(context_size_for_model("anything", &custom), 2048);
    }

    #[test]
    fn exact_match_is_case_sensitive_fuzzy_is_not() {
        let table = ContextSizeTable::empty(1).with_entry("big-model", 100);
        assert_eq!(table.context_size_for("BIG-MODEL"), 100);
        let table = ContextSizeTable::empty(1)
            .with_entry("model", 10)
            .with_entry("Model-X", 20);
        // Exact hit on the second entry beats the fuzzy hit on the first.
        assert_eq!(table.context_size_for("Model-X"), 20);
        assert_eq!(table.context_size_for("model-x"), 10);
    }

    #[test]
    fn deserializes_with_defaults() {
        let table: ContextSizeTable =
            serde_json::from_str(r#"{"entries":[{"pattern":"tiny","context_size":512}]}"#).unwrap();
        assert_eq!(table.default, DEFAULT_CONTEXT_SIZE);
        assert_eq!(table.context_size_for("tiny-v2"), 512);
    }
}
