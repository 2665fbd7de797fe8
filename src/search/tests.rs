//! Tests for the search module
//!
//! End-to-end behavior of indexing and retrieval through a real on-disk index,
//! plus property-based tests for the query fallback path.

use proptest::prelude::*;
use tempfile::TempDir;

use super::query::{escape, parse_query, WILDCARD};
use super::{IndexManager, QueryError, Searcher, TokenPipeline};
use crate::core::{Record, SearchConfig};

fn open_index() -> (IndexManager, Searcher, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = SearchConfig::with_index_path(temp_dir.path().join("index"));
    let manager = IndexManager::open(config, TokenPipeline::default()).unwrap();
    let searcher = manager.searcher();
    (manager, searcher, temp_dir)
}

fn ids(records: &[Record]) -> Vec<i64> {
    let mut ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    ids
}

// ============================================================================
// Indexing and retrieval
// ============================================================================

#[test]
fn test_upsert_keeps_latest_version() {
    let (manager, searcher, _temp_dir) = open_index();
    manager.upsert(&Record::new(1, "news", "first draft")).unwrap();
    manager.upsert(&Record::new(1, "news", "final copy")).unwrap();

    let all = searcher.get_all_data().unwrap();
    assert_eq!(all, vec![Record::new(1, "news", "final copy")]);
    assert!(searcher.search("draft", None).unwrap().is_empty());
    assert_eq!(ids(&searcher.search("final", None).unwrap()), vec![1]);
}

#[test]
fn test_search_returns_stored_text_verbatim() {
    let (manager, searcher, _temp_dir) = open_index();
    let record = Record::new(1, "machine learning basics", "intro");
    manager.upsert(&record).unwrap();

    let results = searcher.search("machine", None).unwrap();
    assert_eq!(results, vec![record]);
}

#[test]
fn test_search_is_case_insensitive() {
    let (manager, searcher, _temp_dir) = open_index();
    manager
        .upsert(&Record::new(3, "Breaking: Markets Rally", "Stocks CLOSED higher"))
        .unwrap();

    assert_eq!(ids(&searcher.search("MARKETS", None).unwrap()), vec![3]);
    assert_eq!(ids(&searcher.search("closed", None).unwrap()), vec![3]);
}

#[test]
fn test_wildcard_only_input_never_touches_index() {
    let (_manager, searcher, temp_dir) = open_index();
    std::fs::remove_dir_all(temp_dir.path().join("index")).unwrap();

    assert!(searcher.search("**", None).unwrap().is_empty());
    assert!(searcher.search("", None).unwrap().is_empty());
    assert!(searcher.search("?", None).unwrap().is_empty());
}

#[test]
fn test_stopword_only_input_is_empty() {
    let (manager, searcher, _temp_dir) = open_index();
    manager.upsert(&Record::new(1, "the end", "of it all")).unwrap();
    assert!(searcher.search("the of", None).unwrap().is_empty());
}

#[test]
fn test_malformed_syntax_falls_back() {
    let (manager, searcher, _temp_dir) = open_index();
    manager
        .upsert(&Record::new(1, "machine learning", "intro"))
        .unwrap();

    let results = searcher.search("machine (learning", None).unwrap();
    assert_eq!(ids(&results), vec![1]);

    assert!(searcher.search("\"unterminated", None).is_ok());
    assert!(searcher.search("x:y", None).is_ok());
}

#[test]
fn test_operator_led_input_falls_back() {
    let (manager, searcher, _temp_dir) = open_index();
    manager
        .upsert(&Record::new(1, "machine learning", "intro"))
        .unwrap();

    for input in ["AND (", "OR machine (", "machine AND OR (", "NOT"] {
        assert!(
            searcher.search(input, None).is_ok(),
            "{:?} raised an error",
            input
        );
        assert!(searcher.search_default(input, None).is_ok());
    }

    let results = searcher.search("OR machine (", None).unwrap();
    assert_eq!(ids(&results), vec![1]);
}

#[test]
fn test_clear_all_then_get_all_data() {
    let (manager, searcher, _temp_dir) = open_index();
    manager
        .upsert_batch(&[
            Record::new(1, "one", "a"),
            Record::new(2, "two", "b"),
            Record::new(3, "three", "c"),
        ])
        .unwrap();
    assert_eq!(ids(&searcher.get_all_data().unwrap()), vec![1, 2, 3]);

    manager.clear_all().unwrap();
    assert!(searcher.get_all_data().unwrap().is_empty());
}

#[test]
fn test_get_all_data_without_index_dir() {
    let (_manager, searcher, temp_dir) = open_index();
    std::fs::remove_dir_all(temp_dir.path().join("index")).unwrap();
    assert!(searcher.get_all_data().unwrap().is_empty());
}

#[test]
fn test_prefix_matches_token_starts_only() {
    let (manager, searcher, _temp_dir) = open_index();
    manager
        .upsert_batch(&[
            Record::new(1, "machine learning", ""),
            Record::new(2, "machine", ""),
        ])
        .unwrap();

    assert_eq!(ids(&searcher.search("mach", None).unwrap()), vec![1, 2]);
    assert!(searcher.search("machinea", None).unwrap().is_empty());
    assert!(searcher.search("achine", None).unwrap().is_empty());
}

#[test]
fn test_hyphenated_input_splits_into_terms() {
    let (manager, searcher, _temp_dir) = open_index();
    manager
        .upsert_batch(&[
            Record::new(1, "state of the art", ""),
            Record::new(2, "art gallery", ""),
        ])
        .unwrap();

    assert_eq!(ids(&searcher.search("state-art", None).unwrap()), vec![1, 2]);
}

#[test]
fn test_delete_removes_from_results() {
    let (manager, searcher, _temp_dir) = open_index();
    manager
        .upsert_batch(&[
            Record::new(1, "election results", "unique zebra"),
            Record::new(2, "election turnout", "other"),
        ])
        .unwrap();

    manager.delete(1).unwrap();

    assert!(searcher.search("zebra", None).unwrap().is_empty());
    assert_eq!(ids(&searcher.search("election", None).unwrap()), vec![2]);
}

#[test]
fn test_chinese_compound_word() {
    let (manager, searcher, _temp_dir) = open_index();
    manager.pipeline().add_word("机器学习");
    manager
        .upsert(&Record::new(1, "机器学习入门", "深度学习与神经网络"))
        .unwrap();
    manager
        .upsert(&Record::new(2, "天气预报", "今天天气很好"))
        .unwrap();

    assert_eq!(ids(&searcher.search("机器学习", None).unwrap()), vec![1]);
    assert_eq!(ids(&searcher.search("天气", None).unwrap()), vec![2]);
}

#[test]
fn test_field_targeted_search() {
    let (manager, searcher, _temp_dir) = open_index();
    manager
        .upsert_batch(&[
            Record::new(1, "rust release", "python news"),
            Record::new(2, "python release", "rust news"),
        ])
        .unwrap();

    assert_eq!(ids(&searcher.search("rust", None).unwrap()), vec![1, 2]);
    assert_eq!(ids(&searcher.search("rust", Some("title")).unwrap()), vec![1]);
    assert_eq!(ids(&searcher.search("rust", Some("content")).unwrap()), vec![2]);
    assert_eq!(ids(&searcher.search("2", Some("id")).unwrap()), vec![2]);
    assert_eq!(ids(&searcher.search("rust", Some("")).unwrap()), vec![1, 2]);

    let err = searcher.search("rust", Some("author")).unwrap_err();
    assert!(matches!(err, QueryError::UnknownField(ref f) if f == "author"));
}

#[test]
fn test_search_default_uses_query_syntax() {
    let (manager, searcher, _temp_dir) = open_index();
    manager
        .upsert_batch(&[
            Record::new(1, "machine learning", "intro"),
            Record::new(2, "machine shop", "tools"),
        ])
        .unwrap();

    let results = searcher.search_default("machine -shop", None).unwrap();
    assert_eq!(ids(&results), vec![1]);

    let results = searcher.search_default("\"machine learning\"", None).unwrap();
    assert_eq!(ids(&results), vec![1]);

    let results = searcher.search_default("title:shop OR content:intro", None).unwrap();
    assert_eq!(ids(&results), vec![1, 2]);

    // no prefix expansion here
    assert!(searcher.search_default("mach", None).unwrap().is_empty());
}

#[test]
fn test_hits_are_capped() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = SearchConfig::with_index_path(temp_dir.path().join("index"));
    config.hits_limit = 2;
    let manager = IndexManager::open(config, TokenPipeline::default()).unwrap();
    let records: Vec<Record> = (0..5).map(|id| Record::new(id, "daily news", "")).collect();
    manager.upsert_batch(&records).unwrap();

    let searcher = manager.searcher();
    assert_eq!(searcher.search("news", None).unwrap().len(), 2);
    assert_eq!(searcher.get_all_data().unwrap().len(), 5);
}

#[test]
fn test_reader_sees_later_commits() {
    let (manager, searcher, _temp_dir) = open_index();
    assert!(searcher.search("weather", None).unwrap().is_empty());

    manager.upsert(&Record::new(9, "weather alert", "")).unwrap();
    assert_eq!(ids(&searcher.search("weather", None).unwrap()), vec![9]);
}

// ============================================================================
// Property tests
// ============================================================================

fn special_fragment_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "(", ")", "\"", "[", "]", "{", "}", "^", "~", ":", "!", "&&", "||", "\\", "/", "+",
        "*", "?",
    ])
}

fn operator_lead_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["", "AND", "OR", "NOT", "machine AND", "OR NOT"])
}

/// Free text mixing operator words, arbitrary printable runs and whitespace
fn free_text_strategy() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        Just("AND".to_string()),
        Just("OR".to_string()),
        Just("NOT".to_string()),
        "\\PC{1,8}",
    ];
    let gap = prop::sample::select(vec![" ", "  ", "\t", "\n"]);
    prop::collection::vec((piece, gap), 1..6)
        .prop_map(|pieces| pieces.into_iter().map(|(p, g)| p + g).collect::<String>())
        .prop_filter("not blank", |s| !s.trim().is_empty())
}

proptest! {
    /// Escaping any non-blank text and appending a wildcard always yields valid syntax
    #[test]
    fn prop_escaped_text_parses(text in free_text_strategy()) {
        let query = format!("{}{}", escape(text.trim()), WILDCARD);
        let parsed = parse_query(&query, &["id", "title", "content"]);
        prop_assert!(parsed.is_ok(), "{:?} -> {:?}: {:?}", text, query, parsed);
    }

    /// Query input with stray syntax characters never surfaces a parse error
    #[test]
    fn prop_stray_syntax_does_not_raise(
        lead in operator_lead_strategy(),
        word in "[a-z]{1,8}",
        fragment in special_fragment_strategy(),
    ) {
        let pipeline = TokenPipeline::default();
        let builder = super::QueryBuilder::new(pipeline, super::IndexSchema::build());
        let input = format!("{} {} {}", lead, word, fragment);
        let result = builder.build(&input, None);
        prop_assert!(result.is_ok(), "{:?}: {:?}", input, result.err());
        let raw = builder.build_raw(&input, None);
        prop_assert!(raw.is_ok(), "{:?}: {:?}", input, raw.err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Repeated upserts of one id leave exactly one document with the last content
    #[test]
    fn prop_upsert_idempotent(
        id in any::<i64>(),
        contents in prop::collection::vec("[a-z]{1,10}", 1..4),
    ) {
        let (manager, searcher, _temp_dir) = open_index();
        for content in &contents {
            manager.upsert(&Record::new(id, "story", content.as_str())).unwrap();
        }

        let all = searcher.get_all_data().unwrap();
        prop_assert_eq!(all.len(), 1);
        prop_assert_eq!(all[0].id, id);
        prop_assert_eq!(&all[0].content, contents.last().unwrap());
    }
}

fn mixed_text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("我爱北京天安门".to_string()),
        Just("机器学习与深度学习".to_string()),
        Just("The Machine Learning Basics".to_string()),
        Just("state-of-the-art NLP 模型".to_string()),
        "[a-zA-Z ]{1,30}",
        "[一-龥]{2,10}",
    ]
}

proptest! {
    /// Indexing and querying analyze the same text to the same terms
    #[test]
    fn prop_tokenization_is_deterministic(text in mixed_text_strategy()) {
        let pipeline = TokenPipeline::default();
        let first = pipeline.tokenize(&text);
        let second = pipeline.clone().tokenize(&text);
        prop_assert_eq!(&first, &second);

        for token in &first {
            prop_assert_eq!(token.text.to_lowercase(), token.text.clone());
            prop_assert!(!pipeline.stopwords().contains(&token.text));
        }
    }

    /// Every expanded piece is a non-empty prefix term free of separators
    #[test]
    fn prop_prefix_expansion_shape(keywords in "[a-z\\- ]{0,40}") {
        let expanded = super::expand_prefix_terms(&keywords);
        let expected: Vec<&str> = keywords
            .split(|c: char| c == ' ' || c == '-')
            .filter(|s| !s.is_empty())
            .collect();

        let pieces: Vec<&str> = expanded.split(' ').filter(|s| !s.is_empty()).collect();
        prop_assert_eq!(pieces.len(), expected.len());
        for (piece, term) in pieces.iter().zip(expected) {
            prop_assert_eq!(*piece, format!("{}*", term));
        }
    }
}
