//! CLI/service configuration: data directory, log level, and REPL prompt.
//! Loaded from an optional JSON file via `serde`, falling back to defaults
//! when the file is absent — the CLI never refuses to start for a missing
//! config.

use std::path::PathBuf;

use anyhow::Result;
use serde_derive::{Deserialize, Serialize};

const DEFAULT_DATA_DIR: &str = "data/bank";
pub const DEFAULT_PROMPT: &str = "bank";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigLoad {
    version: u8,

    /// Where the CLI would persist state if it used a durable store. The
    /// in-memory store ignores this; it is read by the config loader so a
    /// future durable `Store` has somewhere to look.
    data_dir: Option<PathBuf>,

    pub prompt: Option<String>,

    pub log_level: Option<String>,

    /// Show stats (elapsed time) after executing a non-interactive command.
    pub show_stats: Option<bool>,
}

impl Default for ConfigLoad {
    fn default() -> Self {
        ConfigLoad {
            version: 0,
            data_dir: None,
            prompt: Some(DEFAULT_PROMPT.to_string()),
            log_level: Some("info".to_string()),
            show_stats: Some(false),
        }
    }
}

impl ConfigLoad {
    /// Loads configuration from `path`, falling back to defaults if the
    /// file doesn't exist or fails to parse.
    pub fn new(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    pub fn terminal_update(&mut self) {
        self.show_stats = Some(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ConfigLoad::default();
        assert_eq!(cfg.prompt.as_deref(), Some(DEFAULT_PROMPT));
        assert_eq!(cfg.data_dir(), PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn missing_file_is_an_error_callers_handle_with_default() {
        assert!(ConfigLoad::new("/nonexistent/path/bank.json").is_err());
    }
}
