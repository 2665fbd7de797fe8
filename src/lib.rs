//! news-search - full-text search over news records
//!
//! This crate provides:
//! - Chinese and English segmentation with stopword filtering
//! - A persistent tantivy index keyed by record id
//! - Prefix search with graceful recovery from malformed query syntax
//! - A single-writer indexing actor for async callers
//! - Structured logging with rotation

pub mod core;
pub mod indexer;
pub mod logging;
pub mod search;

// Re-export commonly used items
pub use core::error::{NewsSearchError, Result};
pub use core::{Record, SearchConfig};
pub use indexer::{IndexerHandle, IndexingActor};
pub use search::{IndexError, IndexManager, QueryError, Searcher, TokenPipeline};
