//! # Logging Utilities
//!
//! Logging infrastructure for salve using `tracing`.
//!
//! This module provides structured logging with support for:
//! - Two output formats (JSON for machines, pretty for people)
//! - Environment variable configuration
//! - Log level filtering
//! - An optional log file next to the console output
//!
//! Console output always goes to **stderr**, so logs never mix with traces or
//! dumps printed on stdout.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use salve_utils::init_logging;
//!
//! // Keep the guard alive for as long as logs should reach the file
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=salve_core=trace`)
//! - `SALVE_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `SALVE_LOG_FILE`: Optional log file, or a directory to create a dated
//!   `YYYY-MM-DD-salve.log` in

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the [`LogFormat`].
pub const LOG_FORMAT_ENV: &str = "SALVE_LOG_FORMAT";

/// Environment variable naming the log file or directory.
pub const LOG_FILE_ENV: &str = "SALVE_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format
    #[default]
    Pretty,
    /// JSON format, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogConfig
{
    pub format: LogFormat,
    /// Explicit level. When `None`, `RUST_LOG` decides, defaulting to `info`.
    pub level: Option<LogLevel>,
    /// Log file written in addition to stderr.
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read `SALVE_LOG_FORMAT` and `SALVE_LOG_FILE`.
    ///
    /// An unknown format falls back to pretty output.
    pub fn from_env() -> Self
    {
        Self::from_values(env::var(LOG_FORMAT_ENV).ok().as_deref(), env::var(LOG_FILE_ENV).ok().as_deref())
    }

    fn from_values(format: Option<&str>, file: Option<&str>) -> Self
    {
        Self {
            format: format.and_then(|s| s.parse().ok()).unwrap_or_default(),
            level: None,
            file: file.filter(|path| !path.is_empty()).map(log_file_path),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self
    {
        self.level = Some(level);
        self
    }

    fn filter(&self) -> EnvFilter
    {
        match self.level {
            Some(level) => EnvFilter::new(Level::from(level).to_string()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
        }
    }
}

/// A directory gets a dated file name inside it.
fn log_file_path(raw: &str) -> PathBuf
{
    let path = PathBuf::from(raw);
    if path.is_dir() {
        let today = Utc::now().format("%Y-%m-%d");
        path.join(format!("{today}-salve.log"))
    } else {
        path
    }
}

/// Keeps the background log file writer running.
///
/// Dropping it flushes and stops file logging; console logging is unaffected.
#[must_use = "dropping the guard stops file logging"]
#[derive(Default)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// ## Example
///
/// ```rust,no_run
/// use salve_utils::init_logging;
///
/// let _guard = init_logging().expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init_with_config(LogConfig::from_env())
}

/// Initialize logging with explicit level and format
///
/// `SALVE_LOG_FILE` is still honoured.
///
/// ## Example
///
/// ```rust,no_run
/// use salve_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    let mut config = LogConfig::from_env().with_level(level);
    config.format = format;
    init_with_config(config)
}

/// Install the global subscriber described by `config`.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_with_config(config: LogConfig) -> Result<LoggingGuard, LoggingError>
{
    let mut layers = vec![console_layer(config.format, config.filter())];

    let guard = config.file.as_deref().map(|path| {
        let (layer, guard) = file_layer(config.format, config.filter(), path);
        layers.push(layer);
        guard
    });

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(io::stderr);

    match format {
        LogFormat::Pretty => layer.with_ansi(true).with_filter(filter).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, filter: EnvFilter, path: &Path) -> (BoxedLayer, WorkerGuard)
{
    let appender = tracing_appender::rolling::never(
        path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new(".")),
        path.file_name().unwrap_or_default(),
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(false); // No ANSI in files

    let layer = match format {
        LogFormat::Pretty => layer.with_filter(filter).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    };
    (layer, guard)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
