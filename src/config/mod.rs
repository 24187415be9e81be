//! # Configuration Management Module
//!
//! Loads, validates and writes the TOML configuration for mobwatch.
//!
//! ## Configuration Structure
//!
//! - [`BotConfig`] - Bot identity, command prefix and canonical time zone
//! - [`StorageConfig`] - Data directory and save retry policy
//! - [`BoardConfig`] - Status board refresh cadence and title
//! - [`LoggingConfig`] - Logging level and optional log files
//!
//! Every section is optional in the file; missing sections and keys take their
//! defaults.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mobwatch::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Zone: {}", config.timezone()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bot]
//! name = "mobwatch"
//! command_prefix = "!"
//! timezone = "America/New_York"
//!
//! [storage]
//! data_dir = "./data"
//! save_retries = 3
//!
//! [board]
//! refresh_interval_secs = 60
//! send_timeout_secs = 10
//! title = "__**Contested Mob Spawn Windows**__"
//!
//! [logging]
//! level = "info"
//! file = "mobwatch.log"
//! security_file = "mobwatch-security.log"
//! ```

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

use crate::storage::DEFAULT_SAVE_RETRIES;
use crate::tracker::status::{BoardFormat, DEFAULT_BOARD_TITLE};

/// Command prefixes accepted in `[bot].command_prefix`.
pub const ALLOWED_PREFIXES: &[&str] = &["^", "!", "+", "$", "/", ">"];

pub const DEFAULT_TIMEZONE: &str = "America/New_York";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Must be one of [`ALLOWED_PREFIXES`].
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// IANA zone every timestamp is interpreted and stored in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_bot_name() -> String {
    "mobwatch".to_string()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            command_prefix: default_command_prefix(),
            timezone: default_timezone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Full load-modify-save retries after a failed save.
    #[serde(default = "default_save_retries")]
    pub save_retries: u32,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_save_retries() -> u32 {
    DEFAULT_SAVE_RETRIES
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            save_retries: default_save_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Upper bound on one group's edit-or-send round trip.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_board_title")]
    pub title: String,
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_send_timeout_secs() -> u64 {
    10
}

fn default_board_title() -> String {
    DEFAULT_BOARD_TITLE.to_string()
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            title: default_board_title(),
        }
    }
}

impl BoardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: Some("mobwatch.log".to_string()),
            security_file: Some("mobwatch-security.log".to_string()),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config = Self::from_toml(&content)
            .map_err(|e| anyhow!("Failed to load config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        if !ALLOWED_PREFIXES.contains(&self.bot.command_prefix.as_str()) {
            return Err(anyhow!(
                "command_prefix '{}' not allowed (use one of {})",
                self.bot.command_prefix,
                ALLOWED_PREFIXES.join(" ")
            ));
        }
        if self.board.refresh_interval_secs == 0 {
            return Err(anyhow!("board.refresh_interval_secs must be greater than zero"));
        }
        if self.board.send_timeout_secs == 0 {
            return Err(anyhow!("board.send_timeout_secs must be greater than zero"));
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        Ok(())
    }

    /// Canonical zone for parsing and storing timestamps.
    pub fn timezone(&self) -> Result<Tz> {
        self.bot
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Unknown timezone '{}': {}", self.bot.timezone, e))
    }

    pub fn board_format(&self) -> BoardFormat {
        BoardFormat {
            title: self.board.title.clone(),
            prefix: self.bot.command_prefix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::New_York);
        assert_eq!(config.board.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.storage.save_retries, 3);
    }

    #[test]
    fn test_missing_sections_take_defaults() {
        let config = Config::from_toml("[bot]\ncommand_prefix = \"^\"\n").unwrap();
        assert_eq!(config.bot.command_prefix, "^");
        assert_eq!(config.bot.timezone, DEFAULT_TIMEZONE);
        assert_eq!(config.storage.data_dir, "./data");
        assert_eq!(config.board.send_timeout_secs, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let err = Config::from_toml("[bot]\ntimezone = \"Mars/Olympus_Mons\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown timezone"));
    }

    #[test]
    fn test_rejects_disallowed_prefix() {
        for bad in ["#", "", "!!", "?"] {
            let text = format!("[bot]\ncommand_prefix = \"{}\"\n", bad);
            assert!(Config::from_toml(&text).is_err(), "prefix {:?} accepted", bad);
        }
        for good in ALLOWED_PREFIXES {
            let text = format!("[bot]\ncommand_prefix = \"{}\"\n", good);
            assert!(Config::from_toml(&text).is_ok(), "prefix {:?} rejected", good);
        }
    }

    #[test]
    fn test_rejects_zero_intervals() {
        assert!(Config::from_toml("[board]\nrefresh_interval_secs = 0\n").is_err());
        assert!(Config::from_toml("[board]\nsend_timeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_board_format_uses_prefix_and_title() {
        let config =
            Config::from_toml("[bot]\ncommand_prefix = \"/\"\n[board]\ntitle = \"Spawns\"\n")
                .unwrap();
        let fmt = config.board_format();
        assert_eq!(fmt.prefix, "/");
        assert_eq!(fmt.title, "Spawns");
    }

    #[tokio::test]
    async fn test_create_default_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.bot.command_prefix, "!");
        assert_eq!(loaded.logging.file.as_deref(), Some("mobwatch.log"));
    }
}
