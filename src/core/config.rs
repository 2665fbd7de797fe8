//! Configuration for news-search
//!
//! JSON file-based configuration with:
//! - Defaults for every field, so partial files load cleanly
//! - Atomic writes using temp file + rename
//! - Validation before use

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum hits returned by a single search
pub const DEFAULT_HITS_LIMIT: usize = 1000;

/// Memory budget for the index writer (50MB)
pub const DEFAULT_WRITER_MEMORY_BYTES: usize = 50_000_000;

/// Smallest memory budget tantivy accepts for a writer
const MIN_WRITER_MEMORY_BYTES: usize = 15_000_000;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration result type
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Search service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Path to the index directory
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Memory budget for the index writer (in bytes)
    #[serde(default = "default_writer_memory_bytes")]
    pub writer_memory_bytes: usize,

    /// Maximum number of hits returned per search
    #[serde(default = "default_hits_limit")]
    pub hits_limit: usize,

    /// Stopword list, one word per line. Falls back to the built-in set when absent.
    #[serde(default)]
    pub stopwords_path: Option<PathBuf>,

    /// Domain vocabulary injected into the segmenter at startup
    #[serde(default)]
    pub user_words: Vec<String>,

    /// Whether to rebuild the index on schema version mismatch
    #[serde(default = "default_true")]
    pub auto_rebuild_on_mismatch: bool,
}

fn default_index_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("news-search")
        .join("index")
}

fn default_writer_memory_bytes() -> usize {
    DEFAULT_WRITER_MEMORY_BYTES
}

fn default_hits_limit() -> usize {
    DEFAULT_HITS_LIMIT
}

fn default_true() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            writer_memory_bytes: DEFAULT_WRITER_MEMORY_BYTES,
            hits_limit: DEFAULT_HITS_LIMIT,
            stopwords_path: None,
            user_words: Vec::new(),
            auto_rebuild_on_mismatch: true,
        }
    }
}

impl SearchConfig {
    /// Create a configuration rooted at the given index directory
    pub fn with_index_path(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: SearchConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration from a JSON file, or defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => {
                tracing::info!("No configuration at {:?}, using defaults", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save configuration atomically (temp file + rename)
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, path)?;

        tracing::debug!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.hits_limit == 0 {
            return Err(ConfigError::Invalid("hits_limit must be positive".to_string()));
        }
        if self.writer_memory_bytes < MIN_WRITER_MEMORY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "writer_memory_bytes must be at least {}",
                MIN_WRITER_MEMORY_BYTES
            )));
        }
        if self.index_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("index_path must not be empty".to_string()));
        }
        Ok(())
    }
}
