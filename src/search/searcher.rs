//! Read-side operations
//!
//! Each call opens a fresh reader, so results always reflect the latest
//! commit visible at call time. Searchers are cheap to clone and safe to use
//! from several threads at once.

use std::path::PathBuf;

use tantivy::collector::TopDocs;
use tantivy::query::Query;
use tantivy::{DocAddress, Index, IndexReader, ReloadPolicy, SegmentOrdinal, TantivyDocument};

use super::error::{IndexError, QueryError};
use super::mapper::Mapper;
use super::query::QueryBuilder;
use super::schema::IndexSchema;
use super::text_index::has_index_files;
use super::tokenizer::TokenPipeline;
use crate::core::Record;

#[derive(Debug, Clone)]
pub struct Searcher {
    index: Index,
    mapper: Mapper,
    builder: QueryBuilder,
    index_path: PathBuf,
    hits_limit: usize,
}

impl Searcher {
    pub(crate) fn new(
        index: Index,
        schema: IndexSchema,
        pipeline: TokenPipeline,
        index_path: PathBuf,
        hits_limit: usize,
    ) -> Self {
        Self {
            index,
            mapper: Mapper::new(schema.fields()),
            builder: QueryBuilder::new(pipeline, schema),
            index_path,
            hits_limit,
        }
    }

    /// Prefix search over free-form input.
    ///
    /// `field` of `None` searches title and content. Input that yields no
    /// keywords returns an empty list without touching the index.
    pub fn search(&self, input: &str, field: Option<&str>) -> Result<Vec<Record>, QueryError> {
        match self.builder.build(input, field)? {
            Some(query) => self.execute(query.as_ref()),
            None => {
                tracing::debug!(input, "No searchable keywords");
                Ok(Vec::new())
            }
        }
    }

    /// Search with input already written in query syntax, skipping keyword
    /// extraction and prefix expansion
    pub fn search_default(
        &self,
        input: &str,
        field: Option<&str>,
    ) -> Result<Vec<Record>, QueryError> {
        match self.builder.build_raw(input, field)? {
            Some(query) => self.execute(query.as_ref()),
            None => Ok(Vec::new()),
        }
    }

    /// Every live record, in index order.
    ///
    /// An index directory that is missing or empty yields an empty list.
    pub fn get_all_data(&self) -> Result<Vec<Record>, IndexError> {
        if !has_index_files(&self.index_path)? {
            return Ok(Vec::new());
        }

        let searcher = self.snapshot()?;
        let mut docs = Vec::new();
        for (segment_ord, segment_reader) in searcher.segment_readers().iter().enumerate() {
            for doc_id in segment_reader.doc_ids_alive() {
                let address = DocAddress::new(segment_ord as SegmentOrdinal, doc_id);
                docs.push(searcher.doc::<TantivyDocument>(address)?);
            }
        }
        Ok(self.mapper.from_documents(&docs))
    }

    pub fn hits_limit(&self) -> usize {
        self.hits_limit
    }

    fn snapshot(&self) -> Result<tantivy::Searcher, IndexError> {
        let reader: IndexReader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(reader.searcher())
    }

    /// Run a query and map the top hits, best score first
    fn execute(&self, query: &dyn Query) -> Result<Vec<Record>, QueryError> {
        let searcher = self.snapshot()?;
        let top_docs = searcher.search(query, &TopDocs::with_limit(self.hits_limit))?;
        tracing::debug!(hits = top_docs.len(), "Search complete");

        let docs = top_docs
            .iter()
            .map(|(_score, address)| searcher.doc::<TantivyDocument>(*address))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.mapper.from_documents(&docs))
    }
}
