//! App configuration, stored as JSON under the data directory.
//!
//! Every field has a default so a missing or partial file still yields a
//! working configuration.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to write config: {0}")]
    Write(std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn default_window_days() -> i64 {
    90
}

fn default_ranking_limit() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_chat_cron() -> String {
    // Hourly
    "0 * * * *".to_string()
}

fn default_hr_cron() -> String {
    // Every four hours
    "0 */4 * * *".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub cron: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedules {
    #[serde(default = "Schedules::default_chat")]
    pub chat: ScheduleEntry,
    #[serde(default = "Schedules::default_hr")]
    pub hr: ScheduleEntry,
}

impl Schedules {
    fn default_chat() -> ScheduleEntry {
        ScheduleEntry {
            enabled: true,
            cron: default_chat_cron(),
        }
    }

    fn default_hr() -> ScheduleEntry {
        ScheduleEntry {
            enabled: true,
            cron: default_hr_cron(),
        }
    }
}

impl Default for Schedules {
    fn default() -> Self {
        Self {
            chat: Self::default_chat(),
            hr: Self::default_hr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct Config {
    /// Override for the database location. `None` means the default path
    /// under the data directory.
    pub database_path: Option<PathBuf>,
    /// How far back message syncs and rollups reach.
    pub window_days: i64,
    pub ranking_limit: usize,
    pub schedules: Schedules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            window_days: default_window_days(),
            ranking_limit: default_ranking_limit(),
            schedules: Schedules::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
    Ok(home.join(".teampulse").join("config.json"))
}

/// Load the configuration, falling back to defaults when the file is
/// missing or unreadable.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("Could not read {}: {}", path.display(), e);
            return Ok(Config::default());
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => Ok(config),
        Err(e) => {
            log::warn!("Invalid config at {}: {}", path.display(), e);
            Ok(Config::default())
        }
    }
}

pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ConfigError::Write)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(&path, content).map_err(ConfigError::Write)?;
    Ok(())
}
