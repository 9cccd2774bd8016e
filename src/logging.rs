//! Optional tracing output. Off unless a level is given.
//!
//! CLI runs log to stderr. The dashboard owns the terminal, so it only ever
//! logs to a file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::data_dir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Default)]
pub struct LogConfig {
    pub level: Option<LogLevel>,
    pub file: Option<PathBuf>,
    pub dashboard: bool,
}

/// Where log lines go, or `None` when logging is off.
pub fn log_target(config: &LogConfig) -> Option<Option<PathBuf>> {
    config.level?;
    match (&config.file, config.dashboard) {
        (Some(path), _) => Some(Some(path.clone())),
        (None, true) => Some(Some(data_dir().join("kevops.log"))),
        (None, false) => Some(None),
    }
}

/// Hold until exit so buffered lines get flushed.
pub struct LogGuard {
    _guard: WorkerGuard,
}

pub fn init_logging(config: &LogConfig) -> Result<Option<LogGuard>> {
    let (Some(level), Some(target)) = (config.level, log_target(config)) else {
        return Ok(None);
    };

    // Scoped to this crate; reqwest/hyper are noisy at debug.
    let filter = EnvFilter::new(format!("kevops={}", level.as_filter_str()));

    let guard = match target {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
                .init();
            guard
        }
        None => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).compact())
                .init();
            guard
        }
    };

    Ok(Some(LogGuard { _guard: guard }))
}
