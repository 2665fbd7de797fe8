//! Tokenization pipeline for news-search
//!
//! Text goes through three stages, in the same order at index time and at
//! query time:
//! - word segmentation (via jieba-rs, so CJK text without spaces splits into words)
//! - lowercasing
//! - stopword removal
//!
//! The pipeline is registered with tantivy under [`TOKENIZER_NAME`] for the
//! analyzed fields, and the very same analyzer is used to extract query
//! keywords. Diverging the two silently breaks retrieval.

use std::sync::Arc;

use parking_lot::RwLock;
use tantivy::tokenizer::{
    LowerCaser, StopWordFilter, TextAnalyzer, Token, TokenStream, Tokenizer as TantivyTokenizer,
    TokenizerManager,
};

use super::stopwords::StopWords;
use crate::core::SearchConfig;

/// Name under which the pipeline is registered with tantivy
pub const TOKENIZER_NAME: &str = "jieba";

/// A word produced by the segmenter, with byte offsets into the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub word: String,
    pub offset_from: usize,
    pub offset_to: usize,
}

// ============================================================================
// Jieba Segmenter
// ============================================================================

/// Word segmenter backed by jieba-rs.
///
/// Clones share one dictionary, so words added through any clone are seen by
/// every tokenizer built from it.
#[derive(Clone)]
pub struct JiebaSegmenter {
    jieba: Arc<RwLock<jieba_rs::Jieba>>,
}

impl JiebaSegmenter {
    /// Create a new segmenter with the default dictionary
    pub fn new() -> Self {
        Self {
            jieba: Arc::new(RwLock::new(jieba_rs::Jieba::new())),
        }
    }

    /// Split text into words. Whitespace-only segments are dropped.
    pub fn segment(&self, text: &str) -> Vec<Segment> {
        let jieba = self.jieba.read();
        let mut segments = Vec::new();
        let mut cursor = 0;

        for word in jieba.cut(text, true) {
            let offset_from = text[cursor..]
                .find(word)
                .map(|pos| cursor + pos)
                .unwrap_or(cursor);
            let offset_to = offset_from + word.len();
            cursor = offset_to;

            if word.trim().is_empty() {
                continue;
            }
            segments.push(Segment {
                word: word.to_string(),
                offset_from,
                offset_to,
            });
        }

        segments
    }

    /// Add a word to the dictionary so it is kept whole during segmentation.
    /// Returns the frequency assigned to the word.
    pub fn add_word(&self, word: &str) -> usize {
        let freq = self.jieba.write().add_word(word, None, None);
        tracing::debug!(word, freq, "Added word to segmentation dictionary");
        freq
    }
}

impl Default for JiebaSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JiebaSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiebaSegmenter").finish()
    }
}

// ============================================================================
// Tantivy integration
// ============================================================================

/// tantivy tokenizer emitting one token per segment
#[derive(Clone, Debug)]
pub struct JiebaTokenizer {
    segmenter: JiebaSegmenter,
}

impl JiebaTokenizer {
    pub fn new(segmenter: JiebaSegmenter) -> Self {
        Self { segmenter }
    }
}

/// Token stream for [`JiebaTokenizer`]
pub struct JiebaTokenStream {
    segments: Vec<Segment>,
    index: usize,
    token: Token,
}

impl TokenStream for JiebaTokenStream {
    fn advance(&mut self) -> bool {
        let Some(segment) = self.segments.get(self.index) else {
            return false;
        };

        self.token = Token {
            offset_from: segment.offset_from,
            offset_to: segment.offset_to,
            position: self.index,
            text: segment.word.clone(),
            position_length: 1,
        };
        self.index += 1;
        true
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

impl TantivyTokenizer for JiebaTokenizer {
    type TokenStream<'a> = JiebaTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        JiebaTokenStream {
            segments: self.segmenter.segment(text),
            index: 0,
            token: Token::default(),
        }
    }
}

// ============================================================================
// Token Pipeline
// ============================================================================

/// A normalized term with its position in the token sequence.
///
/// Positions count removed stopwords, so phrase queries built from them keep
/// the gaps the index saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    pub text: String,
    pub position: usize,
    pub offset_from: usize,
    pub offset_to: usize,
}

/// Segmentation + lowercasing + stopword filtering, shared by indexing and querying
#[derive(Clone)]
pub struct TokenPipeline {
    segmenter: JiebaSegmenter,
    stopwords: Arc<StopWords>,
    analyzer: TextAnalyzer,
}

impl TokenPipeline {
    /// Build the pipeline. The stopword set is fixed from here on.
    pub fn new(segmenter: JiebaSegmenter, stopwords: StopWords) -> Self {
        let analyzer = TextAnalyzer::builder(JiebaTokenizer::new(segmenter.clone()))
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(
                stopwords.words().map(str::to_string).collect::<Vec<_>>(),
            ))
            .build();

        Self {
            segmenter,
            stopwords: Arc::new(stopwords),
            analyzer,
        }
    }

    /// Build the pipeline from configuration: resolve the stopword list and
    /// inject the configured vocabulary
    pub fn from_config(config: &SearchConfig) -> std::io::Result<Self> {
        let stopwords = StopWords::load(config.stopwords_path.as_deref())?;
        let pipeline = Self::new(JiebaSegmenter::new(), stopwords);
        for word in &config.user_words {
            pipeline.add_word(word);
        }
        Ok(pipeline)
    }

    /// Run text through every stage
    pub fn tokenize(&self, text: &str) -> Vec<AnalyzedToken> {
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        stream.process(&mut |token: &Token| {
            tokens.push(AnalyzedToken {
                text: token.text.clone(),
                position: token.position,
                offset_from: token.offset_from,
                offset_to: token.offset_to,
            });
        });
        tokens
    }

    /// Surviving terms joined with single spaces
    pub fn keywords(&self, text: &str) -> String {
        self.tokenize(text)
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Inject domain vocabulary into the segmentation dictionary
    pub fn add_word(&self, word: &str) -> usize {
        self.segmenter.add_word(word)
    }

    /// The analyzer to attach to indexed text fields
    pub fn analyzer(&self) -> TextAnalyzer {
        self.analyzer.clone()
    }

    /// Register the analyzer with an index's tokenizer manager
    pub fn register(&self, manager: &TokenizerManager) {
        manager.register(TOKENIZER_NAME, self.analyzer());
    }

    pub fn stopwords(&self) -> &StopWords {
        &self.stopwords
    }
}

impl Default for TokenPipeline {
    fn default() -> Self {
        Self::new(JiebaSegmenter::new(), StopWords::default())
    }
}

impl std::fmt::Debug for TokenPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPipeline")
            .field("stopwords", &self.stopwords.len())
            .finish()
    }
}
