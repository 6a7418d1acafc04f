/// Structured logging for the world temperature jobs
///
/// Provides stage-tagged logging (ingest, store, alignment, export...)
/// with an optional key (table, sheet, series) on every event. Events go
/// through `tracing`; `init_logger` installs a console layer and, when a
/// path is given, an append-only file layer.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as layer_fmt, EnvFilter};

use crate::model::LoadSummary;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }

    /// Parses `debug`, `info`, `warn`/`warning` or `error`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Store,
    Align,
    Export,
    Plot,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ingest => write!(f, "INGEST"),
            Stage::Store => write!(f, "DB"),
            Stage::Align => write!(f, "ALIGN"),
            Stage::Export => write!(f, "EXPORT"),
            Stage::Plot => write!(f, "PLOT"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Initialize the global logger.
///
/// `RUST_LOG` overrides `min_level` when set. Calling this twice is
/// harmless: the second subscriber is discarded.
pub fn init_logger(min_level: LogLevel, log_file: Option<&Path>, console_timestamps: bool) -> io::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(min_level.as_filter().into())
        .from_env_lossy();

    let timed = console_timestamps.then(|| {
        layer_fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
    });
    let untimed = (!console_timestamps).then(|| {
        layer_fmt::layer()
            .without_time()
            .with_writer(io::stderr)
            .with_target(false)
    });

    let file = match log_file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?,
        ),
        None => None,
    };
    let file_layer = file.map(|f| {
        layer_fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(f))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(timed)
        .with(untimed)
        .with(file_layer)
        .try_init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(stage: Stage, key: Option<&str>, message: &str) {
    tracing::info!(stage = %stage, key = key.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(stage: Stage, key: Option<&str>, message: &str) {
    tracing::warn!(stage = %stage, key = key.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(stage: Stage, key: Option<&str>, message: &str) {
    tracing::error!(stage = %stage, key = key.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(stage: Stage, key: Option<&str>, message: &str) {
    tracing::debug!(stage = %stage, key = key.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Load Summary Logging
// ---------------------------------------------------------------------------

/// Level a load summary is reported at: clean loads are info, partial
/// loads a warning, loads where nothing made it in an error.
pub fn summary_level(summary: &LoadSummary) -> LogLevel {
    let problems = summary.rejected + summary.duplicates;
    if problems == 0 {
        LogLevel::Info
    } else if summary.inserted == 0 {
        LogLevel::Error
    } else {
        LogLevel::Warning
    }
}

/// Log the outcome of loading one spreadsheet
pub fn log_load_summary(summary: &LoadSummary) {
    let message = format!(
        "Load complete: {}/{} rows inserted, {} duplicates, {} rejected",
        summary.inserted, summary.rows_read, summary.duplicates, summary.rejected
    );

    match summary_level(summary) {
        LogLevel::Error => error(Stage::Ingest, Some(&summary.table), &message),
        LogLevel::Warning => warn(Stage::Ingest, Some(&summary.table), &message),
        _ => info(Stage::Ingest, Some(&summary.table), &message),
    }
}

/// Log a spreadsheet row that was skipped
pub fn log_row_rejection(table: &str, line: u64, reason: &str) {
    debug(Stage::Ingest, Some(table), &format!("line {} rejected: {}", line, reason));
}
