use anyhow::{Context, Result};
use log::{debug, info};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use taskline::cli;
use taskline::config::AppConfig;
use taskline::logging::{init_logger, LogConfig};
use taskline::pipeline::{pipe_lines, PipelineOptions, PipelineSummary};
use tokio::io::BufReader;

fn main() {
    match run() {
        Ok(summary) if summary.is_success() => {}
        Ok(_) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

fn run() -> Result<PipelineSummary> {
    let args = cli::parse_args();
    cli::validate_args(&args)?;

    let (mut config, source) = match &args.config {
        Some(path) => (AppConfig::load_from_file(path)?, Some(path.clone())),
        None => AppConfig::load()?,
    };
    args.apply_to(&mut config);

    init_logger(LogConfig::from_settings(&config.logging)?)?;
    debug!("Parsed CLI arguments: {:?}", args);
    match &source {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let options = PipelineOptions {
        queue: config.queue,
        delay: Duration::from_millis(args.delay_ms),
    };

    // Single-threaded so an enqueued line stays visible until this task yields
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let summary = runtime.block_on(async {
        let output = Arc::new(tokio::sync::Mutex::new(tokio::io::stdout()));
        match &args.input {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("Failed to open input: {}", path.display()))?;
                pipe_lines(BufReader::new(file), output, options).await
            }
            None => pipe_lines(BufReader::new(tokio::io::stdin()), output, options).await,
        }
    })?;

    eprintln!("{}", summary);
    Ok(summary)
}
