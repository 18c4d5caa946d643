// src/main.rs

use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::{json::JsonEncoder, pattern::PatternEncoder, Encode},
    filter::threshold::ThresholdFilter,
    Config,
};
use notion_puller::{
    AppError, CommandLineInput, Crawler, EventSink, LogFormat, LogSink, NotionHttpClient,
    ProgressStore, PullConfig, PullSummary, RetryingClient, RunMode,
};
use std::fs;
use std::sync::Arc;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}";

/// Sets up logging configuration.
///
/// Console output goes to stderr so `--summary-json` keeps stdout clean.
fn setup_logging(
    level: LevelFilter,
    format: LogFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_file_path = std::env::temp_dir().join("notion_puller.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let console_encoder: Box<dyn Encode> = match format {
        LogFormat::Text => Box::new(PatternEncoder::new(LOG_PATTERN)),
        LogFormat::Json => Box::new(JsonEncoder::new()),
    };
    let console_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(console_encoder)
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(level),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Wires the HTTP client, retry decorator, store and crawler for one run.
async fn execute_pull(config: &PullConfig) -> Result<(), AppError> {
    let events: Arc<dyn EventSink> = Arc::new(LogSink::new());

    let http = NotionHttpClient::with_base_url(&config.api_key, config.api_base_url.as_str())?;
    let client = RetryingClient::new(Arc::new(http), config.retry.clone(), events.clone());
    let store = ProgressStore::load(config.state_path(), events.clone());
    let crawler = Crawler::new(Arc::new(client), Arc::new(store), events, config.raw_dir())?
        .with_max_concurrent(config.max_concurrent);

    let summary = match config.mode {
        RunMode::RetryFailed => {
            if crawler.store().failed().is_empty() {
                println!("No failed entities to retry.");
                return Ok(());
            }
            crawler.pull_failed_only().await?
        }
        RunMode::ResetAndPull => {
            crawler.reset()?;
            crawler.run_from_root(&config.root).await?
        }
        RunMode::Pull => crawler.run_from_root(&config.root).await?,
    };

    report_summary(config, &summary)
}

fn report_summary(config: &PullConfig, summary: &PullSummary) -> Result<(), AppError> {
    if config.summary_json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("\nPull completed!");
    println!("{}", summary);
    println!("Data saved to: {}", config.entity_dir().display());
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = CommandLineInput::parse();

    let config = match PullConfig::resolve(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = setup_logging(config.log_level, config.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let exit_code = tokio::select! {
        result = execute_pull(&config) => match result {
            Ok(()) => 0,
            Err(e) => {
                log::error!("Pull failed: {}", e);
                eprintln!("Error: {}", e);
                1
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nPull interrupted by user");
            1
        }
    };

    std::process::exit(exit_code);
}
