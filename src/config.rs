//! Run configuration.
//!
//! Everything the pipeline components consume is constructed here once
//! at startup and passed down explicitly — no ambient globals. Defaults
//! work without a config file; `~/.gmharvest/config.toml` overrides them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::classify::{ClassifierKind, ClassifyErrorPolicy};
use crate::groupme::GROUPME_API_BASE;

/// Hard cap on messages fetched per run unless overridden
pub const DEFAULT_MAX_MESSAGES: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GroupMe API base URL
    pub api_base: String,
    /// Root directory for per-group download folders
    pub download_dir: PathBuf,
    /// Maximum messages to fetch in one run
    pub max_messages: usize,
    /// Terms and phrases the lexical strategy flags
    pub aggressive_words: Vec<String>,
    /// Classification strategy to run
    pub classifier: ClassifierKind,
    /// How the external strategy's per-message failures are handled
    pub on_classify_error: ClassifyErrorPolicy,
    /// Model name for the external strategy
    pub model: String,
    /// OpenAI-compatible endpoint base for the external strategy
    pub openai_api_base: String,
    /// Run log file (append mode); None disables the file layer
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: GROUPME_API_BASE.to_string(),
            download_dir: PathBuf::from("downloads"),
            max_messages: DEFAULT_MAX_MESSAGES,
            aggressive_words: ["hate", "kill", "stupid", "shut up", "dumb", "idiot"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
            classifier: ClassifierKind::Lexical,
            on_classify_error: ClassifyErrorPolicy::Abort,
            model: "gpt-4.1-mini".to_string(),
            openai_api_base: "https://api.openai.com/v1".to_string(),
            log_file: Some(PathBuf::from("gmharvest.log")),
        }
    }
}

impl Config {
    /// Load configuration from a file, falling back to
    /// `~/.gmharvest/config.toml`, falling back to defaults when no file
    /// exists.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home_dir.join(".gmharvest").join("config.toml")
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("invalid config at {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shipped_term_set() {
        let config = Config::default();
        assert_eq!(config.max_messages, 10_000);
        assert!(config.aggressive_words.iter().any(|w| w == "shut up"));
        assert_eq!(config.classifier, ClassifierKind::Lexical);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "max_messages = 250\nclassifier = \"model\"\non_classify_error = \"skip\"\n",
        )
        .unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.max_messages, 250);
        assert_eq!(config.classifier, ClassifierKind::Model);
        assert_eq!(config.on_classify_error, ClassifyErrorPolicy::Skip);
        // Untouched keys keep their defaults.
        assert_eq!(config.api_base, GROUPME_API_BASE);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config.max_messages, DEFAULT_MAX_MESSAGES);
    }
}
