//! Structured logging configuration.
//!
//! Uses `tracing` with `tracing-subscriber` for configurable log levels
//! and structured output.
//!
//! ## Environment Variables
//!
//! - `GMHARVEST_LOG` or `RUST_LOG`: set the filter (e.g. `debug`,
//!   `gmharvest=debug,hyper=warn`)
//! - `GMHARVEST_LOG_FORMAT`: set the output format (`pretty`, `compact`,
//!   `json`)
//!
//! A run log file can additionally be attached; per-item media failures
//! from the extractor end up there.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable with colors
    #[default]
    Pretty,
    /// Compact single-line output
    Compact,
    /// JSON output for log aggregation
    Json,
}

impl LogFormat {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive (e.g. "gmharvest=debug,warn")
    pub filter: String,
    /// Console output format
    pub format: LogFormat,
    /// Append-mode run log file
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "gmharvest=info,warn".to_string(),
            format: LogFormat::Pretty,
            log_file: None,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let filter = std::env::var("GMHARVEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "gmharvest=info,warn".to_string());

        let format = std::env::var("GMHARVEST_LOG_FORMAT")
            .map(|s| LogFormat::from_str(&s))
            .unwrap_or_default();

        Self {
            filter,
            format,
            ..Default::default()
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at the start of the program; later calls are ignored.
pub fn init(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_new(&config.filter)
        .unwrap_or_else(|_| EnvFilter::new("gmharvest=info,warn"));

    let log_file = match &config.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(Arc::new(file))
        }
        None => None,
    };

    match config.format {
        LogFormat::Json => {
            let file_layer = log_file
                .map(|file| fmt::layer().with_ansi(false).with_writer(file));
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .with(file_layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Compact => {
            let file_layer = log_file
                .map(|file| fmt::layer().with_ansi(false).with_writer(file));
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact())
                .with(file_layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        LogFormat::Pretty => {
            let file_layer = log_file
                .map(|file| fmt::layer().with_ansi(false).with_writer(file));
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer())
                .with(file_layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::from_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_str("anything-else"), LogFormat::Pretty);
    }

    #[test]
    fn default_filter_scopes_to_the_crate() {
        let config = LogConfig::default();
        assert!(config.filter.starts_with("gmharvest="));
        assert!(config.log_file.is_none());
    }
}
