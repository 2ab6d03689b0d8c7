//! Shared logging utilities for Pairwatch binaries.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Daily log files kept in the log directory.
const MAX_LOG_FILES: usize = 5;

const PAIRWATCH_CRATES: &[&str] = &[
    "pairwatch",
    "pairwatch_engine",
    "pairwatch_integrity",
    "pairwatch_scout",
    "pairwatch_sinks",
];

/// Configured log level, spelled the way the config file spells it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// `EnvFilter` directives enabling this level for the pairwatch crates.
    pub fn filter_directives(&self) -> String {
        PAIRWATCH_CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, self.directive()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid log level '{0}' (expected DEBUG, INFO, WARN or ERROR)")]
pub struct ParseLogLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(ParseLogLevelError(other.to_string())),
        }
    }
}

/// Logging configuration shared by Pairwatch binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub level: LogLevel,
    /// Directory for the rotated log file. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

/// Daily-rotated `<app>.<date>.log` appender in `dir`, keeping the newest
/// [`MAX_LOG_FILES`] files.
pub fn file_appender(dir: &Path, app_name: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(app_name)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

/// Initialize tracing with stderr output and, if configured, a rolling file.
///
/// `RUST_LOG` overrides the configured level. The returned guard flushes the
/// file writer on drop and must be held for the life of the process.
pub fn init_logging(config: LogConfig<'_>) -> Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.filter_directives()))
    };

    let mut guard = None;
    let file_layer = match &config.log_dir {
        Some(dir) => {
            let (writer, file_guard) =
                tracing_appender::non_blocking(file_appender(dir, config.app_name)?);
            guard = Some(file_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter()),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
