//! Core data types for news-search
//!
//! A [`Record`] is the domain-facing unit that callers push into the index
//! and get back from searches.

use serde::{Deserialize, Serialize};

/// A short text record: identifier plus title and body text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, used as the primary key in the index
    pub id: i64,

    /// Title text (stored and analyzed)
    #[serde(default)]
    pub title: String,

    /// Body text (stored and analyzed)
    #[serde(default)]
    pub content: String,
}

impl Record {
    /// Create a new record
    pub fn new(id: i64, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.id, self.title, self.content)
    }
}
