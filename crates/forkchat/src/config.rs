//! Model settings and the JSON configuration file.
//!
//! [`ModelSettings`] carries the few provider parameters the core cares
//! about (model name, response size, context size). Everything else a
//! provider needs belongs to the request layer and is ignored here.
//!
//! ```json
//! {
//!   "models": [
//!     { "name": "fast", "model": "gpt-4o-mini", "max_tokens": 512 },
//!     { "name": "local", "model": "llama-2-7b-chat", "context_size": 2048 }
//!   ],
//!   "context_sizes": {
//!     "entries": [{ "pattern": "my-finetune", "context_size": 16384 }],
//!     "default": 4096
//!   }
//! }
//! ```
//!
//! An omitted `context_sizes` section falls back to the built-in table of
//! well-known models.

use crate::context::{ContextBudget, ContextSizeTable};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one configured model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    /// Name the configuration is selected by. Default: `"default"`.
    pub name: String,
    /// Model identifier sent to the provider. Default: `"local-model"`.
    pub model: String,
    /// Maximum tokens per response. Default: `150`.
    pub max_tokens: usize,
    /// Explicit context window. When `None`, resolved from the model name.
    pub context_size: Option<usize>,
    /// System personality text sent ahead of the conversation.
    pub personality: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            model: "local-model".to_string(),
            max_tokens: 150,
            context_size: None,
            personality: String::new(),
        }
    }
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            name: model.clone(),
            model,
            ..Self::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_context_size(mut self, context_size: usize) -> Self {
        self.context_size = Some(context_size);
        self
    }

    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = personality.into();
        self
    }

    /// The explicit context size, or the table's size for this model.
    /// An explicit `0` counts as unset.
    pub fn resolved_context_size(&self, table: &ContextSizeTable) -> usize {
        match self.context_size {
            Some(size) if size > 0 => size,
            _ => table.context_size_for(&self.model),
        }
    }

    /// Budget for requests made with these settings.
    pub fn budget(&self, table: &ContextSizeTable) -> ContextBudget {
        ContextBudget::new(self.resolved_context_size(table))
            .with_max_response_tokens(self.max_tokens)
            .with_personality(&self.personality)
    }
}

/// Top-level configuration file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ForkchatConfig {
    pub models: Vec<ModelSettings>,
    pub context_sizes: ContextSizeTable,
}

impl ForkchatConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            models = config.models.len(),
            table_entries = config.context_sizes.entries.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    pub fn with_model(mut self, settings: ModelSettings) -> Self {
        self.models.push(settings);
        self
    }

    /// Select model settings by name.
    pub fn model(&self, name: &str) -> Result<&ModelSettings, ConfigError> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| ConfigError::UnknownModel(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_provider_defaults() {
        let settings = ModelSettings::default();
        assert_eq!(settings.max_tokens, 150);
        assert!(settings.context_size.is_none());
        assert_eq!(settings.resolved_context_size(&ContextSizeTable::default()), 4096);
    }

    #[test]
    fn explicit_context_size_wins() {
        let table = ContextSizeTable::default();
        let settings = ModelSettings::new("gpt-4o").with_context_size(1000);
        assert_eq!(settings.resolved_context_size(&table), 1000);
        let unset = ModelSettings::new("gpt-4o").with_context_size(0);
        assert_eq!(unset.resolved_context_size(&table), 128_000);
    }

    #[test]
    fn budget_reserves_response_and_personality() {
        let settings = ModelSettings::new("x")
            .with_context_size(1000)
            .with_max_tokens(200)
            .with_personality("p".repeat(40));
        let budget = settings.budget(&ContextSizeTable::default());
        assert_eq!(budget.reserved(), 200 + 10 + 100);
        assert_eq!(budget.available(), 690);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "models": [
                    {{ "name": "fast", "model": "gpt-4o", "max_tokens": 512 }},
                    {{ "name": "local", "model": "my-finetune" }}
                ],
                "context_sizes": {{
                    "entries": [{{ "pattern": "my-finetune", "context_size": 16384 }}]
                }}
            }}"#
        )
        .unwrap();

        let config = ForkchatConfig::load(file.path()).unwrap();
        let fast = config.model("fast").unwrap();
        assert_eq!(fast.max_tokens, 512);
        // The file's table replaces the built-in one entirely.
        assert_eq!(fast.resolved_context_size(&config.context_sizes), 4096);
        let local = config.model("local").unwrap();
        assert_eq!(local.max_tokens, 150);
        assert_eq!(local.resolved_context_size(&config.context_sizes), 16384);
        assert!(matches!(config.model("nope"), Err(ConfigError::UnknownModel(_))));
    }

    #[test]
    fn missing_table_uses_builtin() {
        let config: ForkchatConfig = serde_json::from_str(r#"{"models": []}"#).unwrap();
        assert_eq!(config.context_sizes, ContextSizeTable::default());
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            ForkchatConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        let err = ForkchatConfig::load(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.json"));
    }
}
