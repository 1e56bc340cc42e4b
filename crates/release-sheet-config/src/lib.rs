use release_sheet_engine::session::{DEFAULT_TEMPLATE_ARTIST_ID, SessionOptions};
use release_sheet_engine::sync::{DEFAULT_HISTORY_LIMIT, MemoryHistory, SharedStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings for editor sessions. Every field has a default, so an empty
/// file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Idle time after the last keystroke before autosaving
    pub quiet_period_ms: u64,
    /// Versions kept per document
    pub history_limit: usize,
    /// Artist id that marks template sheets
    pub template_artist_id: String,
    pub resubscribe_attempts: u32,
    /// Name recorded on saved versions; environment variables are expanded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quiet_period_ms: 500,
            history_limit: DEFAULT_HISTORY_LIMIT,
            template_artist_id: DEFAULT_TEMPLATE_ARTIST_ID.to_string(),
            resubscribe_attempts: 1,
            author: None,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.author = config.author.map(|author| Self::expand(&author).unwrap_or(author));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/release-sheet");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Options for `release_sheet_engine::open`
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            quiet_period: Duration::from_millis(self.quiet_period_ms),
            template_artist_id: self.template_artist_id.clone(),
            resubscribe_attempts: self.resubscribe_attempts,
            author: self.author.clone(),
        }
    }

    /// In-memory version history over `store`, capped at `history_limit`
    pub fn history(&self, store: SharedStore) -> MemoryHistory {
        MemoryHistory::new(store, self.history_limit)
    }

    fn expand(value: &str) -> Option<String> {
        match shellexpand::env(value) {
            Ok(expanded) => Some(expanded.into_owned()),
            Err(_) => None,
        }
    }
}
