//! Configuration file support for Coach.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/coach/config.toml`.

use crate::history::{DEFAULT_EXERCISE_HISTORY_LIMIT, DEFAULT_RECENT_SESSIONS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Local calendar settings
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ClockConfig {
    /// Offset of the client's local time, in minutes east of UTC
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// History list sizes
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_recent_sessions")]
    pub recent_sessions: usize,

    #[serde(default = "default_exercise_history_limit")]
    pub exercise_history_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            recent_sessions: default_recent_sessions(),
            exercise_history_limit: default_exercise_history_limit(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("coach")
}

fn default_recent_sessions() -> usize {
    DEFAULT_RECENT_SESSIONS
}

fn default_exercise_history_limit() -> usize {
    DEFAULT_EXERCISE_HISTORY_LIMIT
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values no operation can work with
    pub fn validate(&self) -> Result<()> {
        // FixedOffset only accepts offsets strictly inside one day
        if self.clock.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(Error::Config(format!(
                "utc_offset_minutes must be within a day, got {}",
                self.clock.utc_offset_minutes
            )));
        }
        if self.history.recent_sessions == 0 {
            return Err(Error::Config("history.recent_sessions must be positive".into()));
        }
        if self.history.exercise_history_limit == 0 {
            return Err(Error::Config(
                "history.exercise_history_limit must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("coach").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
