// src/config.rs
//! Command-line input and layered run configuration.
//!
//! Settings resolve in order: built-in defaults, an optional TOML file,
//! environment variables, then command-line flags.

use crate::constants::{
    DEFAULT_API_DELAY_SECS, DEFAULT_BACKOFF_FACTOR, DEFAULT_CONFIG_FILE, DEFAULT_DATA_DIR,
    DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_RETRIES, MAX_BACKOFF_SECS, MAX_CONCURRENT_LIMIT,
    NOTION_API_BASE_URL, PULL_STATE_FILE, RAW_DIR,
};
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::types::{ApiKey, NodeId, NodeKind, NodeRef, ValidationError};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Notion block, page or database ID, or a Notion URL ending in one
    pub root: String,

    /// How to fetch the root: block, page or database
    #[arg(short, long, default_value = "block")]
    pub kind: NodeKind,

    /// Forget all recorded progress before pulling
    #[arg(long, default_value_t = false)]
    pub reset: bool,

    /// Retry only the entities that failed in earlier runs
    #[arg(long, default_value_t = false, conflicts_with = "reset")]
    pub retry_failed: bool,

    /// Base directory for pulled data (default: ./data)
    #[arg(short = 'd', long)]
    pub data_dir: Option<PathBuf>,

    /// TOML settings file (default: ./notion-puller.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long, default_value_t = false)]
    pub summary_json: bool,

    /// Console log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// What the driver does after configuration is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Pull from the root, skipping completed entities.
    Pull,
    /// Clear progress, then pull from the root.
    ResetAndPull,
    /// Re-visit only failed entities.
    RetryFailed,
}

/// Keys accepted in the TOML settings file. All optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    notion_token: Option<String>,
    data_dir: Option<PathBuf>,
    api_delay: Option<f64>,
    max_retries: Option<u32>,
    backoff_factor: Option<f64>,
    max_concurrent: Option<usize>,
    log_level: Option<String>,
    api_base_url: Option<String>,
}

/// Resolved run configuration, validated and ready to drive a crawl.
#[derive(Debug, Clone)]
pub struct PullConfig {
    pub root: NodeRef,
    pub api_key: ApiKey,
    /// Base data directory; each root gets its own subdirectory.
    pub data_dir: PathBuf,
    pub api_base_url: String,
    pub retry: RetryPolicy,
    pub max_concurrent: usize,
    pub log_level: LevelFilter,
    pub log_format: LogFormat,
    pub mode: RunMode,
    pub summary_json: bool,
}

impl PullConfig {
    /// Resolves configuration from CLI input and the process environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// Resolves configuration with `env` standing in for the environment.
    pub fn resolve_with(
        cli: CommandLineInput,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let root = NodeRef::new(NodeId::parse_root(&cli.root)?, cli.kind);
        let file = load_file_settings(cli.config.as_deref())?;

        let token = env("NOTION_TOKEN")
            .or_else(|| env("NOTION_API_KEY"))
            .or(file.notion_token)
            .ok_or_else(|| {
                AppError::MissingConfiguration(
                    "NOTION_TOKEN (or NOTION_API_KEY) is not set".to_string(),
                )
            })?;
        let api_key = ApiKey::new(token)?;

        let data_dir = cli
            .data_dir
            .or_else(|| env("DATA_DIR").map(PathBuf::from))
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let api_base_url = env("NOTION_API_BASE_URL")
            .or(file.api_base_url)
            .unwrap_or_else(|| NOTION_API_BASE_URL.to_string());
        url::Url::parse(&api_base_url).map_err(|e| ValidationError::InvalidUrl {
            url: api_base_url.clone(),
            reason: e.to_string(),
        })?;

        let api_delay = env_parsed::<f64>(&env, "API_DELAY")?
            .or(file.api_delay)
            .unwrap_or(DEFAULT_API_DELAY_SECS);
        let max_delay = MAX_BACKOFF_SECS as f64;
        if !(0.0..=max_delay).contains(&api_delay) {
            return Err(out_of_bounds("api_delay", api_delay, 0.0, max_delay).into());
        }

        let max_retries = env_parsed::<u32>(&env, "MAX_RETRIES")?
            .or(file.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries < 1 {
            return Err(out_of_bounds("max_retries", max_retries, 1, u32::MAX).into());
        }

        let backoff_factor = env_parsed::<f64>(&env, "BACKOFF_FACTOR")?
            .or(file.backoff_factor)
            .unwrap_or(DEFAULT_BACKOFF_FACTOR);
        if !backoff_factor.is_finite() || backoff_factor < 1.0 {
            return Err(out_of_bounds("backoff_factor", backoff_factor, 1.0, f64::MAX).into());
        }

        let max_concurrent = env_parsed::<usize>(&env, "MAX_CONCURRENT")?
            .or(file.max_concurrent)
            .unwrap_or(DEFAULT_MAX_CONCURRENT);
        if !(1..=MAX_CONCURRENT_LIMIT).contains(&max_concurrent) {
            return Err(
                out_of_bounds("max_concurrent", max_concurrent, 1, MAX_CONCURRENT_LIMIT).into(),
            );
        }

        let log_level = if cli.verbose {
            LevelFilter::Debug
        } else {
            let raw = env("LOG_LEVEL")
                .or(file.log_level)
                .unwrap_or_else(|| "INFO".to_string());
            LevelFilter::from_str(raw.trim())
                .map_err(|_| ValidationError::InvalidLogLevel(raw.clone()))?
        };

        let mode = if cli.retry_failed {
            RunMode::RetryFailed
        } else if cli.reset {
            RunMode::ResetAndPull
        } else {
            RunMode::Pull
        };

        Ok(PullConfig {
            root,
            api_key,
            data_dir,
            api_base_url,
            retry: RetryPolicy::new(
                Duration::from_secs_f64(api_delay),
                max_retries,
                backoff_factor,
            ),
            max_concurrent,
            log_level,
            log_format: cli.log_format,
            mode,
            summary_json: cli.summary_json,
        })
    }

    /// `<data_dir>/<root_id>`: the state file and snapshot tree for this root.
    pub fn entity_dir(&self) -> PathBuf {
        self.data_dir.join(self.root.id.as_str())
    }

    pub fn state_path(&self) -> PathBuf {
        self.entity_dir().join(PULL_STATE_FILE)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.entity_dir().join(RAW_DIR)
    }
}

/// Reads the settings file. An explicit path must exist; the default file
/// is used only when present.
fn load_file_settings(explicit: Option<&Path>) -> Result<FileSettings, AppError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                return Ok(FileSettings::default());
            }
            default
        }
    };

    let text = std::fs::read_to_string(&path).map_err(|e| AppError::InvalidConfiguration {
        path: path.clone(),
        cause: e.to_string(),
    })?;
    toml::from_str(&text).map_err(|e| AppError::InvalidConfiguration {
        path,
        cause: e.to_string(),
    })
}

fn env_parsed<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::InvalidConfiguration {
                path: PathBuf::from(format!("${}", key)),
                cause: format!("{:?}: {}", raw, e),
            }),
    }
}

fn out_of_bounds<T: ToString>(field: &'static str, value: T, min: T, max: T) -> ValidationError {
    ValidationError::OutOfBounds {
        field,
        value: value.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}
