//! Stopword configuration
//!
//! Resolved once when the token pipeline is built and never mutated
//! afterwards.

use std::collections::HashSet;
use std::path::Path;

/// English stopwords used when no word list file is configured
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
    "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

/// Immutable set of lowercased stopwords
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    /// Build from an arbitrary word list. Entries are trimmed and lowercased,
    /// blank entries are dropped.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Read a word list file, one word per line
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_words(content.lines()))
    }

    /// Load from `path` if it names an existing file, else fall back to the
    /// built-in set
    pub fn load(path: Option<&Path>) -> std::io::Result<Self> {
        match path {
            Some(path) if path.is_file() => {
                let stopwords = Self::from_file(path)?;
                tracing::info!(
                    "Loaded {} stopwords from {:?}",
                    stopwords.len(),
                    path
                );
                Ok(stopwords)
            }
            Some(path) => {
                tracing::debug!("Stopword file {:?} not found, using built-in set", path);
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Empty set: nothing is filtered
    pub fn none() -> Self {
        Self {
            words: HashSet::new(),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words in the set, in no particular order
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

impl Default for StopWords {
    fn default() -> Self {
        Self::from_words(DEFAULT_STOP_WORDS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_set() {
        let stopwords = StopWords::default();
        assert_eq!(stopwords.len(), DEFAULT_STOP_WORDS.len());
        assert!(stopwords.contains("the"));
        assert!(!stopwords.contains("machine"));
    }

    #[test]
    fn test_from_words_normalizes() {
        let stopwords = StopWords::from_words(["  The ", "", "的", "AND"]);
        assert_eq!(stopwords.len(), 3);
        assert!(stopwords.contains("the"));
        assert!(stopwords.contains("and"));
        assert!(stopwords.contains("的"));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stopwords.txt");
        std::fs::write(&path, "的\n了\n\nfoo\n").unwrap();

        let stopwords = StopWords::load(Some(&path)).unwrap();
        assert_eq!(stopwords.len(), 3);
        assert!(stopwords.contains("了"));
        assert!(!stopwords.contains("the"));
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.txt");

        assert_eq!(StopWords::load(Some(&path)).unwrap(), StopWords::default());
        assert_eq!(StopWords::load(None).unwrap(), StopWords::default());
    }
}
