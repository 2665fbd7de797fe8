//! Error types for the search module

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of index failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorKind {
    /// Filesystem read/write failed
    IoFailure,
    /// Another writer holds the index lock
    LockConflict,
    /// Stored data could not be decoded
    Corrupt,
    /// On-disk layout does not match the expected schema
    SchemaMismatch,
    /// Settings were rejected before the index was touched
    InvalidConfig,
    /// Any other engine failure
    Engine,
}

/// Errors raised by index management and retrieval
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Tantivy error: {0}")]
    Tantivy(tantivy::TantivyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index is locked by another writer: {reason}")]
    LockConflict { reason: String },

    #[error("Index corrupted: {reason}")]
    Corrupt { reason: String },

    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: u32, found: u32 },

    #[error("Incompatible schema field '{field}': {reason}")]
    SchemaIncompatible { field: String, reason: String },

    #[error("Index not found at path: {0}")]
    IndexNotFound(PathBuf),

    #[error("Invalid index configuration: {0}")]
    Config(#[from] crate::core::ConfigError),

    #[error("Batch interrupted after {committed} of {total} records were committed: {source}")]
    BatchInterrupted {
        committed: usize,
        total: usize,
        #[source]
        source: Box<IndexError>,
    },
}

impl IndexError {
    /// Classify the failure
    pub fn kind(&self) -> IndexErrorKind {
        match self {
            IndexError::Io(_) | IndexError::IndexNotFound(_) => IndexErrorKind::IoFailure,
            IndexError::LockConflict { .. } => IndexErrorKind::LockConflict,
            IndexError::Corrupt { .. } => IndexErrorKind::Corrupt,
            IndexError::SchemaVersionMismatch { .. } | IndexError::SchemaIncompatible { .. } => {
                IndexErrorKind::SchemaMismatch
            }
            IndexError::Config(_) => IndexErrorKind::InvalidConfig,
            IndexError::BatchInterrupted { source, .. } => source.kind(),
            IndexError::Tantivy(err) => match err {
                tantivy::TantivyError::IoError(_)
                | tantivy::TantivyError::OpenDirectoryError(_)
                | tantivy::TantivyError::OpenReadError(_)
                | tantivy::TantivyError::OpenWriteError(_) => IndexErrorKind::IoFailure,
                tantivy::TantivyError::DataCorruption(_) => IndexErrorKind::Corrupt,
                tantivy::TantivyError::LockFailure(..) => IndexErrorKind::LockConflict,
                tantivy::TantivyError::SchemaError(_) => IndexErrorKind::SchemaMismatch,
                _ => IndexErrorKind::Engine,
            },
        }
    }
}

impl From<tantivy::TantivyError> for IndexError {
    fn from(err: tantivy::TantivyError) -> Self {
        match err {
            tantivy::TantivyError::LockFailure(lock_err, msg) => IndexError::LockConflict {
                reason: match msg {
                    Some(msg) => format!("{:?}: {}", lock_err, msg),
                    None => format!("{:?}", lock_err),
                },
            },
            tantivy::TantivyError::DataCorruption(corruption) => IndexError::Corrupt {
                reason: format!("{:?}", corruption),
            },
            other => IndexError::Tantivy(other),
        }
    }
}

/// Malformed query syntax
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Query is empty")]
    Empty,

    #[error("Unbalanced quote starting at position {position}")]
    UnbalancedQuote { position: usize },

    #[error("Unbalanced parenthesis at position {position}")]
    UnbalancedParen { position: usize },

    #[error("Operator '{operator}' at position {position} has no operand")]
    DanglingOperator { operator: String, position: usize },

    #[error("Unexpected '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("Unsupported syntax '{ch}' at position {position}")]
    UnsupportedSyntax { ch: char, position: usize },

    #[error("Term '{term}' may not start with a wildcard")]
    LeadingWildcard { term: String },

    #[error("Escape character at end of query")]
    TrailingEscape,

    #[error("Unknown field: {field}")]
    UnknownField { field: String },
}

/// Errors surfaced by a search call
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Query parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Unknown search field: {0}")]
    UnknownField(String),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

impl From<tantivy::TantivyError> for QueryError {
    fn from(err: tantivy::TantivyError) -> Self {
        QueryError::Index(err.into())
    }
}
