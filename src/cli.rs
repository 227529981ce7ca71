use clap::Parser;
use anyhow::Result;
use std::path::PathBuf;
use crate::config::AppConfig;
use crate::queue::FailurePolicy;

/// Sequential task queue driver
#[derive(Parser, Debug)]
#[command(name = "taskline")]
#[command(about = "Feed lines through a sequential async task queue, one item at a time, in order")]
#[command(version)]
pub struct Args {
    /// Input file (defaults to stdin)
    pub input: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Console log level: error, warn, info, debug, trace, off
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Stop at the first failed item instead of skipping it
    #[arg(long)]
    pub halt_on_error: bool,

    /// Artificial delay applied to every item, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub delay_ms: u64,

    /// Queue name used in logs
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,
}

/// Parse command line arguments
///
/// Called before the logger exists; the binary logs the result once it does.
pub fn parse_args() -> Args {
    Args::parse()
}

/// Validate CLI argument values
pub fn validate_args(args: &Args) -> Result<()> {
    if let Some(ref format) = args.log_format {
        match format.to_lowercase().as_str() {
            "text" | "json" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Valid options: text, json", format
            )),
        }
    }

    if let Some(ref level) = args.log_level {
        crate::logging::parse_log_level(level)?;
    }

    if let Some(ref name) = args.name {
        if name.trim().is_empty() {
            return Err(anyhow::anyhow!("--name must not be empty"));
        }
    }

    Ok(())
}

impl Args {
    /// Command line values override the configuration file
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(ref format) = self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(ref file) = self.log_file {
            config.logging.file = Some(file.clone());
        }
        if self.halt_on_error {
            config.queue.failure_policy = FailurePolicy::Halt;
        }
        if let Some(ref name) = self.name {
            config.queue.name = name.clone();
        }
    }
}
