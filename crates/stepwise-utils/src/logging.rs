//! # Logging Utilities
//!
//! Logging setup for stepwise using `tracing`.
//!
//! Two modes exist because the two observers own different parts of the
//! terminal:
//! - Headless mode talks to the operator over stdout, so console logs go to
//!   stderr (and optionally to a file).
//! - TUI mode owns the whole terminal, so logs go to a file only.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `RUST_LOG=stepwise_core=debug`),
//!   used when no explicit level is given
//! - `STEPWISE_LOG_FORMAT`: `pretty` (default) or `json`
//! - `STEPWISE_LOG_FILE`: in headless mode, also write logs to this file
//!   (rotated daily)
//!
//! ## Example
//!
//! ```rust,no_run
//! use stepwise_utils::{LogLevel, init_logging};
//!
//! let _guard = init_logging(Some(LogLevel::Debug)).expect("Failed to initialize logging");
//! tracing::info!("Session started");
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the log format
pub const LOG_FORMAT_ENV: &str = "STEPWISE_LOG_FORMAT";

/// Environment variable naming an extra log file for headless mode
pub const LOG_FILE_ENV: &str = "STEPWISE_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(Self::Pretty),
            "json" | "prod" | "production" => Ok(Self::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s}. Use 'pretty' or 'json'"))),
        }
    }
}

impl LogFormat
{
    /// Format from `STEPWISE_LOG_FORMAT`, defaulting to pretty.
    #[must_use]
    pub fn from_env() -> Self
    {
        env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    /// The default
    Info,
    Debug,
    /// Includes every pause and every hook decision
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" | "dbg" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            ))),
        }
    }
}

/// Keeps the background log writer alive. Dropping it flushes pending file
/// output, so hold it until the process is about to exit.
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard
{
    _worker: Option<WorkerGuard>,
}

/// Initialize logging for headless mode: stderr, plus `STEPWISE_LOG_FILE` if set.
///
/// `level` wins over `RUST_LOG`; with neither, the level is `INFO`.
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed or the log file
/// cannot be created.
pub fn init_logging(level: Option<LogLevel>) -> Result<LogGuard, LoggingError>
{
    let format = LogFormat::from_env();
    let mut layers = vec![format_layer(format, io::stderr, true)];

    let mut guard = LogGuard::default();
    if let Some(path) = env::var(LOG_FILE_ENV).ok().map(PathBuf::from) {
        let (writer, worker) = tracing_appender::non_blocking(file_appender(&path, Rotation::DAILY)?);
        layers.push(format_layer(format, writer, false));
        guard._worker = Some(worker);
    }

    install(layers, level)?;
    Ok(guard)
}

/// Initialize file-only logging for TUI mode so log lines never land on the
/// terminal the TUI is drawing.
///
/// Returns the log file path along with the guard.
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed or the log file
/// cannot be created.
pub fn init_logging_for_tui(level: Option<LogLevel>) -> Result<(PathBuf, LogGuard), LoggingError>
{
    let path = tui_log_path(env::var_os("HOME").map(PathBuf::from), &Utc::now().format("%Y-%m-%d").to_string());
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let (writer, worker) = tracing_appender::non_blocking(file_appender(&path, Rotation::NEVER)?);
    install(vec![format_layer(LogFormat::from_env(), writer, false)], level)?;
    Ok((path, LogGuard { _worker: Some(worker) }))
}

/// `~/.stepwise/YYYY-MM-DD-stepwise-tui.log`, or the same name under `/tmp`
/// without a home directory.
#[must_use]
pub fn tui_log_path(home: Option<PathBuf>, date: &str) -> PathBuf
{
    let file = format!("{date}-stepwise-tui.log");
    match home {
        Some(home) => home.join(".stepwise").join(file),
        None => PathBuf::from("/tmp").join(file),
    }
}

/// Filter precedence: explicit level, then `RUST_LOG`, then `INFO`.
fn build_filter(level: Option<LogLevel>) -> EnvFilter
{
    match level {
        Some(level) => EnvFilter::new(Level::from(level).to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
    }
}

fn install(layers: Vec<BoxedLayer>, level: Option<LogLevel>) -> Result<(), LoggingError>
{
    Registry::default()
        .with(layers)
        .with(build_filter(level))
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

fn file_appender(path: &Path, rotation: Rotation) -> Result<rolling::RollingFileAppender, LoggingError>
{
    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| LoggingError::InitializationFailed(format!("{} is not a file path", path.display())))?;

    rolling::Builder::new()
        .rotation(rotation)
        .filename_prefix(name.to_string_lossy())
        .build(dir)
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    match format {
        LogFormat::Pretty => layer.with_ansi(ansi).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// A subscriber was already installed, or the appender could not start
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
