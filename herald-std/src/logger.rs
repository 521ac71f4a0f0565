//! Leveled logger over `tracing`.
//!
//! A [`Logger`] is a cheap handle to a shared minimum level. Writes below the
//! minimum are dropped before they reach `tracing`; everything else becomes a
//! `tracing` event on the `herald` target. [`Logger::install`] sets up the
//! process subscriber: a colorized console layer plus an optional plain layer
//! appending to a file. Both layers follow the live level, so
//! [`Logger::set_level`] takes effect immediately.

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    str::FromStr,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU8, Ordering},
    },
};
use thiserror::Error;
use tracing::{Level, Metadata};
use tracing_subscriber::{
    Layer, Registry,
    filter::{FilterFn, filter_fn},
    fmt::{MakeWriter, writer::MakeWriterExt},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use tracing_subscriber::util::TryInitError;

/// Severity of a log line, ordered `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Verbose diagnostics, including caller locations.
    Debug = 0,
    /// Normal operation.
    Info = 1,
    /// Something unexpected that did not stop processing.
    Warn = 2,
    /// A failure.
    Error = 3,
}

impl LogLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    fn from_tracing(level: &Level) -> Self {
        match *level {
            Level::TRACE | Level::DEBUG => LogLevel::Debug,
            Level::INFO => LogLevel::Info,
            Level::WARN => LogLevel::Warn,
            Level::ERROR => LogLevel::Error,
        }
    }

    /// Lowercase name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown level name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

struct LoggerState {
    level: AtomicU8,
    file: Option<PathBuf>,
}

impl LoggerState {
    fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level()
    }
}

/// A handle to a leveled log sink.
///
/// Clones share the same level.
#[derive(Clone)]
pub struct Logger {
    state: Arc<LoggerState>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("file", &self.state.file)
            .finish()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Error)
    }
}

impl Logger {
    /// Creates a logger writing at `level` and above.
    pub fn new(level: LogLevel) -> Self {
        Self::build(level, None)
    }

    /// Creates a logger that also appends plain lines to `path` once installed.
    pub fn with_file(level: LogLevel, path: impl Into<PathBuf>) -> Self {
        Self::build(level, Some(path.into()))
    }

    fn build(level: LogLevel, file: Option<PathBuf>) -> Self {
        Self {
            state: Arc::new(LoggerState {
                level: AtomicU8::new(level as u8),
                file,
            }),
        }
    }

    /// The current minimum level.
    pub fn level(&self) -> LogLevel {
        self.state.level()
    }

    /// Changes the minimum level for every clone of this logger.
    pub fn set_level(&self, level: LogLevel) {
        self.state.level.store(level as u8, Ordering::Relaxed);
    }

    /// Returns `true` if lines at `level` are written.
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.state.enabled(level)
    }

    /// Returns `true` in verbose mode.
    pub fn is_debug_enabled(&self) -> bool {
        self.enabled(LogLevel::Debug)
    }

    /// The file sink, if configured.
    pub fn file_sink(&self) -> Option<&Path> {
        self.state.file.as_deref()
    }

    /// Writes a debug line.
    pub fn debug(&self, message: impl fmt::Display) {
        self.write(LogLevel::Debug, message);
    }

    /// Writes an info line.
    pub fn info(&self, message: impl fmt::Display) {
        self.write(LogLevel::Info, message);
    }

    /// Writes a warning line.
    pub fn warn(&self, message: impl fmt::Display) {
        self.write(LogLevel::Warn, message);
    }

    /// Writes an error line.
    pub fn error(&self, message: impl fmt::Display) {
        self.write(LogLevel::Error, message);
    }

    /// Writes `message` at `level`; a no-op below the minimum level.
    pub fn write(&self, level: LogLevel, message: impl fmt::Display) {
        if !self.enabled(level) {
            return;
        }
        match level {
            LogLevel::Debug => tracing::debug!(target: "herald", "{}", message),
            LogLevel::Info => tracing::info!(target: "herald", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "herald", "{}", message),
            LogLevel::Error => tracing::error!(target: "herald", "{}", message),
        }
    }

    /// Builds the output layers for this logger.
    ///
    /// Console lines are timestamped and colorized; warnings and errors go
    /// to stderr, the rest to stdout. With a file sink, a second layer
    /// appends uncolored lines to it.
    pub fn layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        let console = tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
            .with_writer(io::stderr.with_max_level(Level::WARN).or_else(io::stdout))
            .with_filter(level_filter(Arc::clone(&self.state)));

        let file = self.state.file.clone().map(|path| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(AppendFile { path })
                .log_internal_errors(false)
                .with_filter(level_filter(Arc::clone(&self.state)))
        });

        console.and_then(file).boxed()
    }

    /// Installs this logger as the process-wide `tracing` subscriber.
    ///
    /// Fails if a subscriber is already installed.
    pub fn install(&self) -> Result<(), TryInitError> {
        tracing_subscriber::registry()
            .with(self.layer::<Registry>())
            .try_init()
    }
}

fn level_filter(state: Arc<LoggerState>) -> FilterFn<impl Fn(&Metadata<'_>) -> bool> {
    filter_fn(move |meta| state.enabled(LogLevel::from_tracing(meta.level())))
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Returns the process-wide logger, creating it on first use.
///
/// The first caller decides the level and file sink; later arguments are
/// ignored. Only the outermost composition point should reach for this;
/// components take a [`Logger`] at construction.
pub fn global(level: LogLevel, file: Option<PathBuf>) -> &'static Logger {
    GLOBAL.get_or_init(|| Logger::build(level, file))
}

/// Opens the sink file in append mode for every line.
///
/// A file that cannot be opened swallows the line.
struct AppendFile {
    path: PathBuf,
}

enum AppendWriter {
    File(File),
    Discard,
}

impl Write for AppendWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            AppendWriter::File(file) => file.write(buf),
            AppendWriter::Discard => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            AppendWriter::File(file) => file.flush(),
            AppendWriter::Discard => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for AppendFile {
    type Writer = AppendWriter;

    fn make_writer(&'a self) -> Self::Writer {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_or(AppendWriter::Discard, AppendWriter::File)
    }
}
