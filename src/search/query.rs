//! Query construction
//!
//! Raw search input becomes a tantivy query in four steps:
//! 1. keyword extraction through the [`TokenPipeline`]
//! 2. prefix expansion: every keyword gets a trailing `*`
//! 3. parsing into a [`ParsedQuery`], retried once with the escaped input on
//!    a [`ParseError`]
//! 4. compilation against the target field(s)
//!
//! The grammar is a small keyword syntax: bare terms, `field:term`,
//! `"phrases"`, `(groups)`, `+`/`-` prefixes, `AND`/`OR`/`NOT`, `*`/`?`
//! wildcards and backslash escapes. Plain terms are
//! analyzed like indexed text. Wildcard terms are only lowercased and match
//! against the term dictionary.

use tantivy::query::{
    BooleanQuery, EmptyQuery, Occur as TantivyOccur, PhraseQuery, Query, RegexQuery, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::Term;

use super::error::{ParseError, QueryError};
use super::schema::{FieldPolicy, IndexSchema};
use super::tokenizer::TokenPipeline;

/// Matches any run of characters inside a term
pub const WILDCARD: char = '*';

/// Matches exactly one character inside a term
pub const SINGLE_WILDCARD: char = '?';

/// Characters with meaning in the query grammar
pub const SPECIAL_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
    '/',
];

/// Words read as boolean operators when they stand alone
const OPERATOR_WORDS: &[&str] = &["AND", "OR", "NOT"];

/// Backslash-escape every special character and every standalone operator
/// word so the text parses as literal terms
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 1);
    let mut at_word_start = true;
    for (i, ch) in text.char_indices() {
        if at_word_start && starts_with_operator_word(&text[i..]) {
            escaped.push('\\');
        }
        if SPECIAL_CHARS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
        at_word_start = ch.is_whitespace();
    }
    escaped
}

fn starts_with_operator_word(text: &str) -> bool {
    text.split(char::is_whitespace)
        .next()
        .is_some_and(|word| OPERATOR_WORDS.contains(&word))
}

/// Split keywords on whitespace and hyphens and turn each piece into a prefix term
pub fn expand_prefix_terms(keywords: &str) -> String {
    keywords
        .split(|c: char| c.is_whitespace() || c == '-')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| format!("{}{}", term, WILDCARD))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether nothing but wildcard markers and whitespace remains
pub fn is_blank_query(text: &str) -> bool {
    text.chars()
        .all(|c| c == WILDCARD || c == SINGLE_WILDCARD || c.is_whitespace())
}

// ============================================================================
// Syntax tree
// ============================================================================

/// How a clause contributes to its enclosing query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Should,
    Must,
    MustNot,
}

impl From<Occur> for TantivyOccur {
    fn from(occur: Occur) -> Self {
        match occur {
            Occur::Should => TantivyOccur::Should,
            Occur::Must => TantivyOccur::Must,
            Occur::MustNot => TantivyOccur::MustNot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    /// Unescaped term text, analyzed at compile time
    Term { field: Option<String>, text: String },
    /// Anchored regex over raw index terms
    Wildcard { field: Option<String>, pattern: String },
    /// Quoted text, analyzed at compile time
    Phrase { field: Option<String>, text: String },
    Group(Vec<Clause>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub occur: Occur,
    pub node: QueryNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub clauses: Vec<Clause>,
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct Word {
    /// Text with escapes resolved
    literal: String,
    /// Regex when the word contains unescaped wildcards
    pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme {
    Word(Word),
    Phrase(String),
    LParen,
    RParen,
    Colon,
    Plus,
    Minus,
    And,
    Or,
    Not,
}

impl Lexeme {
    fn describe(&self) -> String {
        match self {
            Lexeme::Word(word) => word.literal.clone(),
            Lexeme::Phrase(text) => format!("\"{}\"", text),
            Lexeme::LParen => "(".to_string(),
            Lexeme::RParen => ")".to_string(),
            Lexeme::Colon => ":".to_string(),
            Lexeme::Plus => "+".to_string(),
            Lexeme::Minus => "-".to_string(),
            Lexeme::And => "AND".to_string(),
            Lexeme::Or => "OR".to_string(),
            Lexeme::Not => "NOT".to_string(),
        }
    }

    /// Whether an operand may not start here
    fn ends_operand(&self) -> bool {
        matches!(self, Lexeme::RParen | Lexeme::And | Lexeme::Or)
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    lexeme: Lexeme,
    position: usize,
}

fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | ':' | '"')
}

fn lex(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let position = i;

        let lexeme = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '(' => Lexeme::LParen,
            ')' => Lexeme::RParen,
            ':' => Lexeme::Colon,
            '+' => Lexeme::Plus,
            '-' => Lexeme::Minus,
            '"' => {
                let (text, end) = lex_phrase(&chars, i)?;
                i = end;
                Lexeme::Phrase(text)
            }
            _ => {
                let (lexeme, end) = lex_word(&chars, i)?;
                tokens.push(Spanned { lexeme, position });
                i = end;
                continue;
            }
        };

        tokens.push(Spanned { lexeme, position });
        i += 1;
    }

    Ok(tokens)
}

/// Read a quoted phrase starting at the opening quote. Returns the text and
/// the index of the closing quote.
fn lex_phrase(chars: &[char], start: usize) -> Result<(String, usize), ParseError> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let escaped = chars.get(i + 1).ok_or(ParseError::TrailingEscape)?;
                text.push(*escaped);
                i += 2;
            }
            '"' => return Ok((text, i)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    Err(ParseError::UnbalancedQuote { position: start })
}

/// Read a bare word. Returns the lexeme and the index just past the word.
fn lex_word(chars: &[char], start: usize) -> Result<(Lexeme, usize), ParseError> {
    let mut literal = String::new();
    let mut pattern = String::new();
    let mut raw = String::new();
    let mut has_wildcard = false;
    let mut escaped_any = false;
    let mut i = start;

    while i < chars.len() && !is_word_boundary(chars[i]) {
        let c = chars[i];
        match c {
            '\\' => {
                let next = *chars.get(i + 1).ok_or(ParseError::TrailingEscape)?;
                literal.push(next);
                push_literal_pattern(&mut pattern, next);
                raw.push(c);
                raw.push(next);
                escaped_any = true;
                i += 2;
                continue;
            }
            '{' | '}' | '[' | ']' | '^' | '~' | '/' => {
                return Err(ParseError::UnsupportedSyntax { ch: c, position: i });
            }
            WILDCARD | SINGLE_WILDCARD => {
                if i == start {
                    let term: String = chars[start..]
                        .iter()
                        .take_while(|c| !is_word_boundary(**c))
                        .collect();
                    return Err(ParseError::LeadingWildcard { term });
                }
                pattern.push_str(if c == WILDCARD { ".*" } else { "." });
                has_wildcard = true;
            }
            _ => {
                literal.push(c);
                push_literal_pattern(&mut pattern, c);
            }
        }
        raw.push(c);
        i += 1;
    }

    let lexeme = match raw.as_str() {
        "AND" if !escaped_any => Lexeme::And,
        "OR" if !escaped_any => Lexeme::Or,
        "NOT" if !escaped_any => Lexeme::Not,
        _ => Lexeme::Word(Word {
            literal,
            pattern: has_wildcard.then_some(pattern),
        }),
    };
    Ok((lexeme, i))
}

fn push_literal_pattern(pattern: &mut String, c: char) {
    for lower in c.to_lowercase() {
        pattern.push_str(&regex::escape(lower.encode_utf8(&mut [0; 4])));
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    fields: &'a [&'a str],
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Lexeme> {
        self.tokens.get(self.pos).map(|t| &t.lexeme)
    }

    fn peek_at(&self, offset: usize) -> Option<&Lexeme> {
        self.tokens.get(self.pos + offset).map(|t| &t.lexeme)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_operand_end(&self) -> bool {
        self.peek().map_or(true, Lexeme::ends_operand)
    }

    fn parse_sequence(&mut self, field: Option<&str>) -> Result<Vec<Clause>, ParseError> {
        let mut clauses: Vec<Clause> = Vec::new();

        while let Some(lexeme) = self.peek() {
            if *lexeme == Lexeme::RParen {
                break;
            }

            let is_conjunction = matches!(lexeme, Lexeme::And | Lexeme::Or);
            let conjunction = if is_conjunction { self.next() } else { None };
            if let Some(ref conj) = conjunction {
                if clauses.is_empty() || self.at_operand_end() {
                    return Err(ParseError::DanglingOperator {
                        operator: conj.lexeme.describe(),
                        position: conj.position,
                    });
                }
            }

            let mut clause = self.parse_clause(field)?;
            if matches!(conjunction, Some(Spanned { lexeme: Lexeme::And, .. })) {
                if let Some(prev) = clauses.last_mut() {
                    if prev.occur == Occur::Should {
                        prev.occur = Occur::Must;
                    }
                }
                if clause.occur == Occur::Should {
                    clause.occur = Occur::Must;
                }
            }
            clauses.push(clause);
        }

        Ok(clauses)
    }

    fn parse_clause(&mut self, field: Option<&str>) -> Result<Clause, ParseError> {
        let occur = match self.peek() {
            Some(Lexeme::Plus) => Occur::Must,
            Some(Lexeme::Minus) | Some(Lexeme::Not) => Occur::MustNot,
            _ => Occur::Should,
        };
        if occur != Occur::Should {
            if let Some(modifier) = self.next() {
                if self.at_operand_end() {
                    return Err(ParseError::DanglingOperator {
                        operator: modifier.lexeme.describe(),
                        position: modifier.position,
                    });
                }
            }
        }

        let has_field_prefix = matches!(
            (self.peek(), self.peek_at(1)),
            (Some(Lexeme::Word(_)), Some(Lexeme::Colon))
        );
        let field = if has_field_prefix {
            Some(self.parse_field_prefix()?)
        } else {
            field.map(str::to_string)
        };

        let node = self.parse_primary(field)?;
        Ok(Clause { occur, node })
    }

    fn parse_field_prefix(&mut self) -> Result<String, ParseError> {
        let Some(Spanned {
            lexeme: Lexeme::Word(word),
            ..
        }) = self.next()
        else {
            return Err(ParseError::Empty);
        };
        let colon_position = self.next().map_or(0, |t| t.position);

        if word.pattern.is_some() || !self.fields.contains(&word.literal.as_str()) {
            return Err(ParseError::UnknownField {
                field: word.literal,
            });
        }
        if self.at_operand_end() || self.peek() == Some(&Lexeme::Colon) {
            return Err(ParseError::DanglingOperator {
                operator: ":".to_string(),
                position: colon_position,
            });
        }
        Ok(word.literal)
    }

    fn parse_primary(&mut self, field: Option<String>) -> Result<QueryNode, ParseError> {
        let Some(token) = self.next() else {
            return Err(ParseError::Empty);
        };

        match token.lexeme {
            Lexeme::Word(Word {
                pattern: Some(pattern),
                ..
            }) => Ok(QueryNode::Wildcard { field, pattern }),
            Lexeme::Word(Word { literal, .. }) => Ok(QueryNode::Term {
                field,
                text: literal,
            }),
            Lexeme::Phrase(text) => Ok(QueryNode::Phrase { field, text }),
            Lexeme::LParen => {
                let inner = self.parse_sequence(field.as_deref())?;
                match self.next() {
                    Some(Spanned {
                        lexeme: Lexeme::RParen,
                        position,
                    }) if inner.is_empty() => Err(ParseError::UnexpectedToken {
                        token: ")".to_string(),
                        position,
                    }),
                    Some(Spanned {
                        lexeme: Lexeme::RParen,
                        ..
                    }) => Ok(QueryNode::Group(inner)),
                    _ => Err(ParseError::UnbalancedParen {
                        position: token.position,
                    }),
                }
            }
            Lexeme::RParen => Err(ParseError::UnbalancedParen {
                position: token.position,
            }),
            other => Err(ParseError::UnexpectedToken {
                token: other.describe(),
                position: token.position,
            }),
        }
    }
}

/// Parse query text. `fields` lists the names accepted in `field:` prefixes.
pub fn parse_query(input: &str, fields: &[&str]) -> Result<ParsedQuery, ParseError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        fields,
    };
    let clauses = parser.parse_sequence(None)?;

    if let Some(extra) = parser.next() {
        return Err(ParseError::UnbalancedParen {
            position: extra.position,
        });
    }
    Ok(ParsedQuery { clauses })
}

// ============================================================================
// Builder
// ============================================================================

/// A resolved search target
type Target = (Field, FieldPolicy);

/// Turns search input into executable tantivy queries
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pipeline: TokenPipeline,
    schema: IndexSchema,
    field_names: Vec<&'static str>,
}

impl QueryBuilder {
    pub fn new(pipeline: TokenPipeline, schema: IndexSchema) -> Self {
        let field_names = schema.field_names();
        Self {
            pipeline,
            schema,
            field_names,
        }
    }

    /// Resolve the caller's field choice. `None` or an empty name means all
    /// analyzed fields.
    pub fn resolve_targets(&self, field: Option<&str>) -> Result<Vec<Target>, QueryError> {
        match field.filter(|name| !name.is_empty()) {
            None => Ok(self
                .schema
                .analyzed_fields()
                .into_iter()
                .map(|field| (field, FieldPolicy::Analyzed))
                .collect()),
            Some(name) => self
                .schema
                .resolve(name)
                .map(|target| vec![target])
                .ok_or_else(|| QueryError::UnknownField(name.to_string())),
        }
    }

    /// Keyword extraction and prefix expansion. `None` when no keyword survives.
    pub fn prepare(&self, input: &str) -> Option<String> {
        if input.is_empty() {
            return None;
        }
        let keywords = self.pipeline.keywords(input);
        if keywords.is_empty() {
            return None;
        }
        Some(expand_prefix_terms(&keywords))
    }

    /// Parse `query_text`, retrying once with `original` escaped plus a
    /// trailing wildcard. `Ok(None)` when the text holds nothing but wildcards.
    pub fn parse_with_fallback(
        &self,
        query_text: &str,
        original: &str,
    ) -> Result<Option<ParsedQuery>, ParseError> {
        if is_blank_query(query_text) {
            return Ok(None);
        }

        match parse_query(query_text.trim(), &self.field_names) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(first) => {
                let retry = format!("{}{}", escape(original.trim()), WILDCARD);
                tracing::warn!(
                    query = query_text,
                    retry = retry.as_str(),
                    "Query parse failed ({}), retrying escaped",
                    first
                );
                parse_query(&retry, &self.field_names).map(Some)
            }
        }
    }

    /// Build a prefix query from free-form search input
    pub fn build(
        &self,
        input: &str,
        field: Option<&str>,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        let targets = self.resolve_targets(field)?;
        let Some(query_text) = self.prepare(input) else {
            return Ok(None);
        };
        tracing::debug!(input, query = query_text.as_str(), "Prepared search query");

        match self.parse_with_fallback(&query_text, input)? {
            Some(parsed) => Ok(Some(self.compile(&parsed, &targets)?)),
            None => Ok(None),
        }
    }

    /// Build a query from input already written in query syntax
    pub fn build_raw(
        &self,
        input: &str,
        field: Option<&str>,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        let targets = self.resolve_targets(field)?;
        if input.is_empty() {
            return Ok(None);
        }

        match self.parse_with_fallback(input, input)? {
            Some(parsed) => Ok(Some(self.compile(&parsed, &targets)?)),
            None => Ok(None),
        }
    }

    /// Compile a parsed query. Clauses whose text analyzes to nothing are dropped.
    pub fn compile(
        &self,
        parsed: &ParsedQuery,
        targets: &[Target],
    ) -> Result<Box<dyn Query>, QueryError> {
        Ok(self
            .compile_clauses(&parsed.clauses, targets)?
            .unwrap_or_else(|| Box::new(EmptyQuery)))
    }

    fn compile_clauses(
        &self,
        clauses: &[Clause],
        targets: &[Target],
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        let mut subqueries: Vec<(TantivyOccur, Box<dyn Query>)> = Vec::new();
        for clause in clauses {
            if let Some(query) = self.compile_node(&clause.node, targets)? {
                subqueries.push((clause.occur.into(), query));
            }
        }

        if subqueries.len() == 1 && subqueries[0].0 != TantivyOccur::MustNot {
            return Ok(subqueries.pop().map(|(_, query)| query));
        }
        if subqueries.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(BooleanQuery::new(subqueries))))
    }

    fn compile_node(
        &self,
        node: &QueryNode,
        targets: &[Target],
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        match node {
            QueryNode::Term { field, text } | QueryNode::Phrase { field, text } => {
                let targets = self.targets_for(field.as_deref(), targets)?;
                let queries = targets
                    .iter()
                    .filter_map(|&(field, policy)| self.text_query(field, policy, text))
                    .collect();
                Ok(union(queries))
            }
            QueryNode::Wildcard { field, pattern } => {
                let targets = self.targets_for(field.as_deref(), targets)?;
                let mut queries = Vec::with_capacity(targets.len());
                for (field, _) in targets {
                    let query: Box<dyn Query> = Box::new(RegexQuery::from_pattern(pattern, field)?);
                    queries.push(query);
                }
                Ok(union(queries))
            }
            QueryNode::Group(clauses) => self.compile_clauses(clauses, targets),
        }
    }

    fn targets_for(&self, field: Option<&str>, defaults: &[Target]) -> Result<Vec<Target>, QueryError> {
        match field {
            Some(name) => self.resolve_targets(Some(name)),
            None => Ok(defaults.to_vec()),
        }
    }

    /// Term or phrase query for literal text on one field
    fn text_query(&self, field: Field, policy: FieldPolicy, text: &str) -> Option<Box<dyn Query>> {
        match policy {
            FieldPolicy::ExactMatch => Some(Box::new(TermQuery::new(
                Term::from_field_text(field, text),
                IndexRecordOption::Basic,
            ))),
            FieldPolicy::Analyzed => {
                let tokens = self.pipeline.tokenize(text);
                match tokens.as_slice() {
                    [] => None,
                    [token] => Some(Box::new(TermQuery::new(
                        Term::from_field_text(field, &token.text),
                        IndexRecordOption::WithFreqs,
                    ))),
                    [first, ..] => {
                        let base = first.position;
                        let terms = tokens
                            .iter()
                            .map(|t| (t.position - base, Term::from_field_text(field, &t.text)))
                            .collect();
                        Some(Box::new(PhraseQuery::new_with_offset(terms)))
                    }
                }
            }
        }
    }
}

/// OR a list of per-field queries together
fn union(mut queries: Vec<Box<dyn Query>>) -> Option<Box<dyn Query>> {
    match queries.len() {
        0 => None,
        1 => queries.pop(),
        _ => Some(Box::new(BooleanQuery::union(queries))),
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::search::stopwords::StopWords;
    use crate::search::tokenizer::JiebaSegmenter;

    const FIELDS: &[&str] = &["id", "title", "content"];

    fn term(text: &str) -> Clause {
        Clause {
            occur: Occur::Should,
            node: QueryNode::Term {
                field: None,
                text: text.to_string(),
            },
        }
    }

    #[test]
    fn test_expand_prefix_terms() {
        assert_eq!(expand_prefix_terms("machine learning"), "machine* learning*");
        assert_eq!(expand_prefix_terms("state-of-art  x"), "state* of* art* x*");
        assert_eq!(expand_prefix_terms(" - "), "");
        assert_eq!(expand_prefix_terms("机器 学习"), "机器* 学习*");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a+b"), "a\\+b");
        assert_eq!(escape("(x) \"y\""), "\\(x\\) \\\"y\\\"");
        assert_eq!(escape("title:foo*"), "title\\:foo\\*");
        assert_eq!(escape("机器学习"), "机器学习");
    }

    #[test]
    fn test_escape_neutralizes_operator_words() {
        assert_eq!(escape("AND ("), "\\AND \\(");
        assert_eq!(escape("a OR\tNOT b"), "a \\OR\t\\NOT b");
        assert_eq!(escape("ANDROID or NOTE"), "ANDROID or NOTE");
        assert_eq!(escape("(AND"), "\\(AND");
    }

    #[test]
    fn test_blank_query() {
        assert!(is_blank_query("**"));
        assert!(is_blank_query(" *? "));
        assert!(is_blank_query(""));
        assert!(!is_blank_query("a*"));
    }

    #[test]
    fn test_parse_terms_and_wildcards() {
        let parsed = parse_query("Machine* learn?ng basics", FIELDS).unwrap();
        assert_eq!(
            parsed.clauses,
            vec![
                Clause {
                    occur: Occur::Should,
                    node: QueryNode::Wildcard {
                        field: None,
                        pattern: "machine.*".to_string()
                    },
                },
                Clause {
                    occur: Occur::Should,
                    node: QueryNode::Wildcard {
                        field: None,
                        pattern: "learn.ng".to_string()
                    },
                },
                term("basics"),
            ]
        );
    }

    #[test]
    fn test_parse_wildcard_escapes_regex_metacharacters() {
        let parsed = parse_query("c\\+\\+*", FIELDS).unwrap();
        assert_eq!(
            parsed.clauses[0].node,
            QueryNode::Wildcard {
                field: None,
                pattern: "c\\+\\+.*".to_string()
            }
        );
    }

    #[test]
    fn test_parse_operators() {
        let parsed = parse_query("+a -b NOT d", FIELDS).unwrap();
        let occurs: Vec<_> = parsed.clauses.iter().map(|c| c.occur).collect();
        assert_eq!(occurs, vec![Occur::Must, Occur::MustNot, Occur::MustNot]);
    }

    #[test]
    fn test_symbol_operators_are_plain_text() {
        let parsed = parse_query("a && b || !c", FIELDS).unwrap();
        assert_eq!(
            parsed.clauses,
            vec![term("a"), term("&&"), term("b"), term("||"), term("!c")]
        );
    }

    #[test]
    fn test_parse_and_promotes_neighbours() {
        let parsed = parse_query("a AND b c", FIELDS).unwrap();
        let occurs: Vec<_> = parsed.clauses.iter().map(|c| c.occur).collect();
        assert_eq!(occurs, vec![Occur::Must, Occur::Must, Occur::Should]);

        let parsed = parse_query("a AND b OR c", FIELDS).unwrap();
        let occurs: Vec<_> = parsed.clauses.iter().map(|c| c.occur).collect();
        assert_eq!(occurs, vec![Occur::Must, Occur::Must, Occur::Should]);
    }

    #[test]
    fn test_parse_field_and_group() {
        let parsed = parse_query("title:(a \"b c\") content:d", FIELDS).unwrap();
        assert_eq!(
            parsed.clauses[0].node,
            QueryNode::Group(vec![
                Clause {
                    occur: Occur::Should,
                    node: QueryNode::Term {
                        field: Some("title".to_string()),
                        text: "a".to_string()
                    }
                },
                Clause {
                    occur: Occur::Should,
                    node: QueryNode::Phrase {
                        field: Some("title".to_string()),
                        text: "b c".to_string()
                    }
                },
            ])
        );
        assert_eq!(
            parsed.clauses[1].node,
            QueryNode::Term {
                field: Some("content".to_string()),
                text: "d".to_string()
            }
        );
    }

    #[test]
    fn test_hyphen_inside_word_is_literal() {
        let parsed = parse_query("e-mail", FIELDS).unwrap();
        assert_eq!(parsed.clauses, vec![term("e-mail")]);
    }

    #[test]
    fn test_escaped_keyword_is_a_term() {
        let parsed = parse_query("\\AND", FIELDS).unwrap();
        assert_eq!(parsed.clauses, vec![term("AND")]);
    }

    #[test]
    fn test_parse_errors() {
        let cases: Vec<(&str, fn(&ParseError) -> bool)> = vec![
            ("", |e| matches!(e, ParseError::Empty)),
            ("\"open", |e| matches!(e, ParseError::UnbalancedQuote { position: 0 })),
            ("(a b", |e| matches!(e, ParseError::UnbalancedParen { position: 0 })),
            ("a b)", |e| matches!(e, ParseError::UnbalancedParen { position: 3 })),
            ("()", |e| matches!(e, ParseError::UnexpectedToken { position: 1, .. })),
            ("AND a", |e| matches!(e, ParseError::DanglingOperator { .. })),
            ("a OR", |e| matches!(e, ParseError::DanglingOperator { .. })),
            ("a +", |e| matches!(e, ParseError::DanglingOperator { .. })),
            ("title:", |e| matches!(e, ParseError::DanglingOperator { .. })),
            ("author:x", |e| matches!(e, ParseError::UnknownField { .. })),
            ("*foo", |e| matches!(e, ParseError::LeadingWildcard { .. })),
            ("a~2", |e| matches!(e, ParseError::UnsupportedSyntax { ch: '~', .. })),
            ("[a TO b]", |e| matches!(e, ParseError::UnsupportedSyntax { ch: '[', .. })),
            ("foo\\", |e| matches!(e, ParseError::TrailingEscape)),
            (": a", |e| matches!(e, ParseError::UnexpectedToken { .. })),
        ];

        for (input, check) in cases {
            let err = parse_query(input, FIELDS).unwrap_err();
            assert!(check(&err), "unexpected error {:?} for {:?}", err, input);
        }
    }

    #[test]
    fn test_escaped_input_always_parses() {
        for input in [
            "(a", "a)", "\"x", "AND*", "x:y", "{}", "a~b^2", "\\", "-", "*", "AND (", "OR machine (",
            "machine AND OR (", "NOT", "a\tAND\nb",
        ] {
            let escaped = format!("{}{}", escape(input), WILDCARD);
            assert!(
                parse_query(&escaped, FIELDS).is_ok(),
                "escaped form of {:?} failed to parse: {:?}",
                input,
                escaped
            );
        }
    }

    fn builder() -> QueryBuilder {
        let pipeline = TokenPipeline::new(JiebaSegmenter::new(), StopWords::none());
        QueryBuilder::new(pipeline, IndexSchema::build())
    }

    #[test]
    fn test_fallback_recovers_operator_led_input() {
        let builder = builder();
        for input in ["AND (", "OR machine (", "machine AND OR ("] {
            let parsed = builder.parse_with_fallback(input, input).unwrap();
            assert!(parsed.is_some(), "no query for {:?}", input);
        }
    }

    #[test]
    fn test_fallback_failure_propagates() {
        // The retry text is blank, so it is a lone wildcard and fails too
        let err = builder().parse_with_fallback("(", "  ").unwrap_err();
        assert!(matches!(err, ParseError::LeadingWildcard { .. }));
    }

    #[test]
    fn test_builder_accepts_schema_field_names() {
        let builder = builder();
        assert!(builder.parse_with_fallback("title:x", "title:x").unwrap().is_some());
        // Unknown field falls back to the literal text
        let parsed = builder
            .parse_with_fallback("author:x", "author:x")
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed.clauses[0].node,
            QueryNode::Wildcard {
                field: None,
                pattern: "author:x.*".to_string()
            }
        );
    }
}
