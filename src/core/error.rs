//! Error types for news-search
//!
//! Each module owns a `thiserror` enum; this file ties them together into
//! the crate-wide [`NewsSearchError`].

use thiserror::Error;

pub use super::config::ConfigError;
pub use crate::logging::LoggingError;
pub use crate::search::{IndexError, QueryError};

/// Result type alias for news-search operations
pub type Result<T> = std::result::Result<T, NewsSearchError>;

/// Main error type for news-search
#[derive(Error, Debug)]
pub enum NewsSearchError {
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Indexer stopped: {0}")]
    IndexerStopped(String),
}

impl NewsSearchError {
    /// Whether the failure came from the caller's query text rather than the index
    pub fn is_query_error(&self) -> bool {
        matches!(self, NewsSearchError::Query(_))
    }
}
