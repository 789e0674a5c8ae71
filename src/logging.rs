//! Structured logging configuration
//!
//! The library only emits `tracing` events. Binaries install a subscriber
//! with [`init_logging`], configured from `MLFLOW_PROMPTS_LOG_*` variables:
//! - `MLFLOW_PROMPTS_LOG_LEVEL`: filter directive, e.g. `debug` or `mlflow_prompts=trace`
//! - `MLFLOW_PROMPTS_LOG_FORMAT`: `json`, `pretty` or `compact`
//! - `MLFLOW_PROMPTS_LOG_COLOR`, `MLFLOW_PROMPTS_LOG_LOCATION`, `MLFLOW_PROMPTS_LOG_SPANS`: booleans

use anyhow::Result;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "MLFLOW_PROMPTS_LOG_LEVEL";

/// Logging configuration for different environments
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
    /// Enable colored output
    pub colored: bool,
    /// Enable source location logging
    pub with_location: bool,
    /// Enable span timing
    pub with_spans: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging for production
    Json,
    /// Pretty human-readable for development
    Pretty,
    /// Compact single-line format
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            colored: is_terminal::IsTerminal::is_terminal(&std::io::stderr()),
            with_location: false,
            with_spans: false,
        }
    }
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl LogConfig {
    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let level = lookup(ENV_LOG_LEVEL)
            .filter(|l| !l.is_empty())
            .unwrap_or(defaults.level);

        let format = match lookup("MLFLOW_PROMPTS_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some("compact") => LogFormat::Compact,
            _ => defaults.format,
        };

        let colored = lookup("MLFLOW_PROMPTS_LOG_COLOR")
            .map(|v| flag(&v))
            .unwrap_or(defaults.colored);

        let with_location = lookup("MLFLOW_PROMPTS_LOG_LOCATION")
            .map(|v| flag(&v))
            .unwrap_or(false);

        let with_spans = lookup("MLFLOW_PROMPTS_LOG_SPANS")
            .map(|v| flag(&v))
            .unwrap_or(false);

        Self {
            level,
            format,
            colored,
            with_location,
            with_spans,
        }
    }

    /// Whether logging was asked for explicitly through the environment.
    pub fn requested() -> bool {
        env::var(ENV_LOG_LEVEL).map(|v| !v.is_empty()).unwrap_or(false)
    }
}

/// Initialize the global tracing subscriber on stderr
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_new(&config.level)
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let span_events = if config.with_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.colored)
        .with_span_events(span_events)
        .with_file(config.with_location)
        .with_line_number(config.with_location);

    match config.format {
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize JSON logging: {}", e))?,
        LogFormat::Pretty => subscriber
            .pretty()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize pretty logging: {}", e))?,
        LogFormat::Compact => subscriber
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize compact logging: {}", e))?,
    }

    info!(
        level = %config.level,
        format = ?config.format,
        colored = config.colored,
        "Logging initialized"
    );

    Ok(())
}

/// Log a CLI command's outcome with timing
pub fn log_command_execution<T>(command_name: &str, duration_ms: u64, result: &Result<T>) {
    let span = tracing::info_span!(
        "command_execution",
        command = command_name,
        duration_ms = duration_ms
    );
    let _enter = span.enter();

    match result {
        Ok(_) => info!(
            command = command_name,
            duration_ms = duration_ms,
            "Command completed"
        ),
        Err(e) => error!(
            command = command_name,
            duration_ms = duration_ms,
            error = %e,
            "Command failed"
        ),
    }
}
