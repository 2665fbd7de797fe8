//! news-search core module
//!
//! This module contains:
//! - Configuration management
//! - Error types
//! - Core data types

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use config::{ConfigError, ConfigResult, SearchConfig};
pub use error::{NewsSearchError, Result};
pub use types::Record;
