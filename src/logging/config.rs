//! Logging configuration types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Crate target used for the `--verbose` directive
const CRATE_TARGET: &str = "news_search";

/// Engine target; its merge and commit chatter is kept at warn by default
const ENGINE_TARGET: &str = "tantivy";

/// Log verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format for console and file output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// How often the log file rolls over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging setup. Console output is always on; rolling files are written
/// only when `log_directory` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub log_directory: Option<PathBuf>,

    #[serde(default)]
    pub rotation: RotationStrategy,

    /// Per-target overrides on top of `level`
    #[serde(default = "default_module_levels")]
    pub module_levels: BTreeMap<String, LogLevel>,
}

fn default_module_levels() -> BTreeMap<String, LogLevel> {
    BTreeMap::from([(ENGINE_TARGET.to_string(), LogLevel::Warn)])
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            log_directory: None,
            rotation: RotationStrategy::Daily,
            module_levels: default_module_levels(),
        }
    }
}

impl LoggingConfig {
    /// Preset for the command line driver. `verbose` turns on debug output
    /// for this crate only; the engine stays at warn.
    pub fn for_cli(verbose: bool) -> Self {
        let config = Self::default();
        if verbose {
            config.with_module_level(CRATE_TARGET, LogLevel::Debug)
        } else {
            config
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Also write rolling log files into `dir`
    pub fn with_log_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_directory = Some(dir.into());
        self
    }

    pub fn with_module_level(mut self, target: impl Into<String>, level: LogLevel) -> Self {
        self.module_levels.insert(target.into(), level);
        self
    }
}

/// `<local data dir>/news-search/logs`, or `./logs` when the platform has none
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("news-search").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}
