//! Full-text search over news records
//!
//! This module provides:
//! - Jieba segmentation with lowercasing and stopword removal
//! - A tantivy index over `id`, `title` and `content`
//! - Schema version control and stale lock recovery
//! - Prefix search with a single escaped retry on malformed queries

pub mod error;
pub mod mapper;
pub mod query;
pub mod schema;
pub mod searcher;
pub mod stopwords;
pub mod text_index;
pub mod tokenizer;

#[cfg(test)]
mod tests;

pub use error::{IndexError, IndexErrorKind, ParseError, QueryError};
pub use mapper::Mapper;
pub use query::{escape, expand_prefix_terms, parse_query, ParsedQuery, QueryBuilder};
pub use schema::{FieldPolicy, IndexSchema, CONTENT_FIELD, ID_FIELD, TITLE_FIELD};
pub use searcher::Searcher;
pub use stopwords::{StopWords, DEFAULT_STOP_WORDS};
pub use text_index::{IndexManager, SCHEMA_VERSION, WRITER_LOCK_FILE};
pub use tokenizer::{AnalyzedToken, JiebaSegmenter, JiebaTokenizer, TokenPipeline, TOKENIZER_NAME};
