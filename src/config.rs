use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::queue::QueueConfig;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "TASKLINE_CONFIG";

/// Application configuration - one table per concern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `[queue]` table
    pub queue: QueueConfig,
    /// `[logging]` table
    pub logging: LoggingConfig,
}

/// Logging settings as they appear in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console level: error, warn, info, debug, trace, off
    pub level: String,
    /// Line format: text or json
    pub format: String,
    /// Optional log file
    pub file: Option<PathBuf>,
    /// Level for the log file, defaults to the console level
    pub file_level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
            file_level: None,
        }
    }
}

impl AppConfig {
    /// Load configuration using discovery hierarchy.
    ///
    /// Returns the file it was read from, or `None` when defaults were used.
    /// Runs before the logger is installed, so it reports through the return
    /// value instead of logging.
    pub fn load() -> Result<(Self, Option<PathBuf>)> {
        match find_config_file() {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML content")
    }
}

/// First existing file in the discovery hierarchy
pub fn find_config_file() -> Option<PathBuf> {
    discover_config_files().into_iter().find(|path| path.exists())
}

/// Discover configuration files in order of precedence
pub fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $TASKLINE_CONFIG
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("taskline").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".taskline.toml"));
    }

    // 4. Project local
    paths.push(PathBuf::from("./.taskline.toml"));

    paths
}
