// Logging module for taskline
// Line-oriented logger behind the `log` facade
//
// - Text or JSON lines
// - Console (stderr), optionally mirrored to a file
// - Independent levels for console and file output
// - Local timestamps formatted as YYYY-MM-DD HH:mm:ss
//
// The library only emits through `log::*!` macros; installing this logger is
// left to the binary.

use log::{Level, LevelFilter};
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use anyhow::{Context, Result};
use crate::config::LoggingConfig;

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}. Valid options: text, json", s)),
        }
    }
}

/// Log destination options
#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    Both(PathBuf),
}

/// JSON log entry structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_level: Option<LevelFilter>,
    pub format: LogFormat,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Info,
            file_level: None,
            format: LogFormat::Text,
            destination: LogDestination::Console,
        }
    }
}

impl LogConfig {
    /// Build from the `[logging]` configuration table
    pub fn from_settings(settings: &LoggingConfig) -> Result<Self> {
        let console_level = parse_log_level(&settings.level)?;
        let format = settings.format.parse::<LogFormat>().map_err(anyhow::Error::msg)?;

        let (destination, file_level) = match &settings.file {
            Some(path) => {
                let file_level = match &settings.file_level {
                    Some(level) => parse_log_level(level)?,
                    None => console_level,
                };
                (LogDestination::Both(path.clone()), Some(file_level))
            }
            None => (LogDestination::Console, None),
        };

        Ok(Self {
            console_level,
            file_level,
            format,
            destination,
        })
    }

    /// Most verbose level any destination accepts
    pub fn max_level(&self) -> LevelFilter {
        match self.file_level {
            Some(file_level) if file_level > self.console_level => file_level,
            _ => self.console_level,
        }
    }
}

/// Logger writing formatted lines to stderr and/or a file
pub struct TasklineLogger {
    config: LogConfig,
    file: Option<Mutex<File>>,
}

impl TasklineLogger {
    pub fn new(config: LogConfig) -> Result<Self> {
        let file = match &config.destination {
            LogDestination::Console => None,
            LogDestination::Both(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file: {}", path.display()))?;
                Some(Mutex::new(file))
            }
        };
        Ok(Self { config, file })
    }

    fn format_timestamp() -> String {
        let now: DateTime<Local> = Local::now();
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_record(&self, level: Level, target: &str, message: &str) -> String {
        match self.config.format {
            LogFormat::Text => format!(
                "{} [{}] {}",
                Self::format_timestamp(),
                level.to_string().to_uppercase(),
                message
            ),
            LogFormat::Json => {
                let entry = JsonLogEntry {
                    timestamp: Self::format_timestamp(),
                    level: level.to_string().to_uppercase(),
                    target: target.to_string(),
                    message: message.to_string(),
                };
                serde_json::to_string(&entry).unwrap_or_else(|e| {
                    format!("{} [{}] {} (json error: {})", Self::format_timestamp(), level, message, e)
                })
            }
        }
    }

    fn to_console(&self, level: Level) -> bool {
        level <= self.config.console_level
    }

    fn to_file(&self, level: Level) -> bool {
        self.file.is_some() && self.config.file_level.is_some_and(|file_level| level <= file_level)
    }
}

impl log::Log for TasklineLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.to_console(metadata.level()) || self.to_file(metadata.level())
    }

    fn log(&self, record: &log::Record) {
        let level = record.level();
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = self.format_record(level, record.target(), &record.args().to_string());

        if self.to_console(level) {
            let _ = writeln!(io::stderr(), "{}", line);
        }
        if self.to_file(level) {
            if let Some(file) = &self.file {
                if let Err(e) = writeln!(file.lock(), "{}", line) {
                    let _ = writeln!(io::stderr(), "File logging error: {}", e);
                }
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config.max_level();
    let logger = TasklineLogger::new(config)?;

    log::set_boxed_logger(Box::new(logger))
        .context("Failed to set global logger")?;
    log::set_max_level(max_level);

    Ok(())
}

/// Convert string to LevelFilter
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        "off" => Ok(LevelFilter::Off),
        _ => Err(anyhow::anyhow!("Invalid log level: {}. Valid levels: error, warn, info, debug, trace, off", level_str)),
    }
}
