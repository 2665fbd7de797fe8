//! Logging system for news-search
//!
//! Structured `tracing` output with configurable verbosity, text or JSON
//! formatting, and optional rolling log files.

mod config;


pub use config::{default_log_directory, LogFormat, LogLevel, LoggingConfig, RotationStrategy};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "news-search.log";

/// Logging system errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    InitializationError(String),

    #[error("Failed to create log directory {path:?}: {source}")]
    DirectoryCreationError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for logging operations
pub type LoggingResult<T> = Result<T, LoggingError>;

/// Installed logging state. Dropping it flushes and closes file output.
pub struct LoggingSystem {
    config: LoggingConfig,
    _guard: Option<WorkerGuard>,
}

impl LoggingSystem {
    /// Install the global subscriber: console always, files when a
    /// directory is configured.
    pub fn init(config: LoggingConfig) -> LoggingResult<Self> {
        let (file_layer, guard) = match config.log_directory.as_deref() {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|source| {
                    LoggingError::DirectoryCreationError {
                        path: dir.to_path_buf(),
                        source,
                    }
                })?;
                let (layer, guard) = create_file_layer(&config, dir);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(build_env_filter(&config))
            .with(create_console_layer(&config))
            .with(file_layer)
            .try_init()
            .map_err(|e| LoggingError::InitializationError(e.to_string()))?;

        Ok(Self {
            config,
            _guard: guard,
        })
    }

    pub fn log_directory(&self) -> Option<&Path> {
        self.config.log_directory.as_deref()
    }
}

/// Build environment filter from configuration.
///
/// `RUST_LOG` wins over the configured level when set; per-target
/// directives are layered on top either way.
pub(crate) fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    for (target, level) in &config.module_levels {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring invalid log directive for {}: {}", target, e),
        }
    }

    filter
}

pub(crate) fn to_rotation(strategy: RotationStrategy) -> Rotation {
    match strategy {
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
        RotationStrategy::Never => Rotation::NEVER,
    }
}

fn create_console_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.boxed(),
    }
}

fn create_file_layer<S>(
    config: &LoggingConfig,
    dir: &Path,
) -> (Box<dyn Layer<S> + Send + Sync + 'static>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let appender = RollingFileAppender::new(to_rotation(config.rotation), dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_ansi(false);

    match config.format {
        LogFormat::Json => (layer.json().boxed(), guard),
        LogFormat::Text => (layer.boxed(), guard),
    }
}
