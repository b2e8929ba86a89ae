//! Configuration management
//!
//! Manages storage location, listing defaults and chat bot settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::ViewLength;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "CADENCE_DATA_DIR";

/// Environment variable holding the bot token
pub const BOT_TOKEN_ENV: &str = "CADENCE_BOT_TOKEN";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where user data lives
    #[serde(default)]
    pub storage: StorageConfig,
    /// Listing defaults
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Chat bot settings
    #[serde(default)]
    pub bot: BotConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory override (defaults to the platform data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Entries shown by `view` when no length is given
    #[serde(default = "default_view_length")]
    pub default_view_length: usize,
}

fn default_view_length() -> usize {
    7
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_view_length: default_view_length(),
        }
    }
}

impl TrackerConfig {
    /// Default listing length as a [`ViewLength`]
    pub fn view_length(&self) -> ViewLength {
        match self.default_view_length {
            0 => ViewLength::All,
            n => ViewLength::Count(n),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Command prefix, e.g. `/add today`
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// User allowed to run `saveall` and `kill`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Bot API token (the environment variable takes precedence)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// Long-poll timeout for incoming updates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_prefix() -> String {
    "/".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            owner_id: None,
            bot_token: None,
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl BotConfig {
    /// Resolve the bot token from the environment or the config file
    pub fn token(&self) -> Result<String> {
        std::env::var(BOT_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.bot_token.clone())
            .with_context(|| {
                format!("Bot token not configured. Set {} or bot.bot_token in config.", BOT_TOKEN_ENV)
            })
    }
}

impl Config {
    /// Load configuration from the default location, writing defaults if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load configuration from `path`, writing defaults if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            let config: Config = toml::from_str(&contents)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        std::fs::write(path, self.to_toml()?)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Serialize as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Effective data directory: explicit override, env var, config, platform default
    pub fn data_dir(&self, override_dir: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir);
        }
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "cadence", "cadence")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the default data directory path
pub fn default_data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "cadence", "cadence")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}
