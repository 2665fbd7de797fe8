//! Index lifecycle and mutations
//!
//! [`IndexManager`] owns the on-disk tantivy index. Every mutating call opens
//! its own writer session, commits, and releases the writer lock before
//! returning, including on error paths.
//!
//! Only one writer may exist at a time. Callers must serialize `upsert`,
//! `upsert_batch`, `delete`, `clear_all` and `optimize` themselves, for
//! example through [`crate::indexer::IndexerHandle`]. Reads may run
//! concurrently with each other and with writes.

use std::path::{Path, PathBuf};

use tantivy::{Index, IndexWriter, Term};

use super::error::IndexError;
use super::mapper::Mapper;
use super::schema::IndexSchema;
use super::searcher::Searcher;
use super::tokenizer::TokenPipeline;
use crate::core::{Record, SearchConfig};

/// Current schema version - increment when the field table changes
pub const SCHEMA_VERSION: u32 = 1;

/// Schema version file name
const SCHEMA_VERSION_FILE: &str = ".schema_version";

/// Lock file tantivy creates while a writer is open
pub const WRITER_LOCK_FILE: &str = ".tantivy-writer.lock";

/// Owner of the index location and all write operations
pub struct IndexManager {
    index: Index,
    schema: IndexSchema,
    mapper: Mapper,
    pipeline: TokenPipeline,
    config: SearchConfig,
    /// Record id whose staging fails, for exercising interrupted batches
    #[cfg(test)]
    fail_on_id: Option<i64>,
}

impl IndexManager {
    /// Create or open the index described by `config`.
    ///
    /// The configuration is validated before anything on disk is touched.
    /// A write lock left behind by a crashed process is cleared here, once.
    /// This assumes no other live process is writing to the same directory.
    pub fn open(config: SearchConfig, pipeline: TokenPipeline) -> Result<Self, IndexError> {
        config.validate()?;
        let index_path = config.index_path.clone();

        if has_index_files(&index_path)? {
            let stored_version = read_schema_version(&index_path)?;
            if stored_version != SCHEMA_VERSION {
                if config.auto_rebuild_on_mismatch {
                    tracing::warn!(
                        "Schema version mismatch (expected {}, found {}), rebuilding index",
                        SCHEMA_VERSION,
                        stored_version
                    );
                    std::fs::remove_dir_all(&index_path)?;
                } else {
                    return Err(IndexError::SchemaVersionMismatch {
                        expected: SCHEMA_VERSION,
                        found: stored_version,
                    });
                }
            }
        }

        let (index, schema) = if has_index_files(&index_path)? {
            let index = Index::open_in_dir(&index_path)?;
            let schema = IndexSchema::from_existing(index.schema())?;
            (index, schema)
        } else {
            std::fs::create_dir_all(&index_path)?;
            let schema = IndexSchema::build();
            let index = Index::create_in_dir(&index_path, schema.schema().clone())?;
            write_schema_version(&index_path, SCHEMA_VERSION)?;
            tracing::info!("Created index at {:?}", index_path);
            (index, schema)
        };

        pipeline.register(index.tokenizers());

        let manager = Self {
            mapper: Mapper::new(schema.fields()),
            index,
            schema,
            pipeline,
            config,
            #[cfg(test)]
            fail_on_id: None,
        };
        manager.recover_from_crash()?;
        Ok(manager)
    }

    /// Remove a stale writer lock file. Returns whether one was found.
    pub fn recover_from_crash(&self) -> Result<bool, IndexError> {
        let lock_path = self.config.index_path.join(WRITER_LOCK_FILE);
        if !lock_path.exists() {
            return Ok(false);
        }

        tracing::warn!("Removing stale index writer lock {:?}", lock_path);
        match std::fs::remove_file(&lock_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(IndexError::LockConflict {
                reason: format!("cannot remove {:?}: {}", lock_path, e),
            }),
        }
    }

    /// Open a writer session
    pub(crate) fn writer(&self) -> Result<IndexWriter, IndexError> {
        let writer = self
            .index
            .writer_with_num_threads(1, self.config.writer_memory_bytes)?;
        Ok(writer)
    }

    /// Commit and wait for merges, which releases the writer lock
    fn finish(mut writer: IndexWriter) -> Result<(), IndexError> {
        writer.commit()?;
        writer.wait_merging_threads()?;
        Ok(())
    }

    /// Stage delete-then-insert for one record
    fn stage_upsert(&self, writer: &IndexWriter, record: &Record) -> Result<(), IndexError> {
        #[cfg(test)]
        if self.fail_on_id == Some(record.id) {
            return Err(IndexError::Corrupt {
                reason: format!("injected failure for record {}", record.id),
            });
        }
        writer.delete_term(self.id_term(record.id));
        writer.add_document(self.mapper.to_document(record))?;
        Ok(())
    }

    fn id_term(&self, id: i64) -> Term {
        Term::from_field_text(self.schema.fields().id, &id.to_string())
    }

    /// Insert or replace one record
    pub fn upsert(&self, record: &Record) -> Result<(), IndexError> {
        self.upsert_batch(std::slice::from_ref(record)).map(|_| ())
    }

    /// Insert or replace many records in one writer session.
    ///
    /// Not transactional: if a record fails, the records before it are still
    /// committed, the failing record and everything after it are not, and
    /// the error reports how many made it in.
    pub fn upsert_batch(&self, records: &[Record]) -> Result<usize, IndexError> {
        let writer = self.writer()?;

        let mut staged = 0;
        let mut failure = None;
        for record in records {
            if let Err(e) = self.stage_upsert(&writer, record) {
                failure = Some(e);
                break;
            }
            staged += 1;
        }

        Self::finish(writer)?;

        match failure {
            None => {
                tracing::debug!(count = staged, "Upserted records");
                Ok(staged)
            }
            Some(e) => {
                tracing::warn!(
                    committed = staged,
                    total = records.len(),
                    "Batch upsert interrupted: {}",
                    e
                );
                Err(IndexError::BatchInterrupted {
                    committed: staged,
                    total: records.len(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Delete the record with `id`. Absent ids are not an error.
    pub fn delete(&self, id: i64) -> Result<(), IndexError> {
        let writer = self.writer()?;
        writer.delete_term(self.id_term(id));
        Self::finish(writer)?;
        tracing::debug!(id, "Deleted record");
        Ok(())
    }

    /// Remove every document, leaving an empty index
    pub fn clear_all(&self) -> Result<(), IndexError> {
        let writer = self.writer()?;
        writer.delete_all_documents()?;
        Self::finish(writer)?;
        tracing::info!("Cleared index at {:?}", self.config.index_path);
        Ok(())
    }

    /// Merge all segments into one and drop obsolete files.
    ///
    /// Maintenance only; not needed for correctness.
    pub fn optimize(&self) -> Result<(), IndexError> {
        let mut writer = self.writer()?;
        let segment_ids = self.index.searchable_segment_ids()?;
        if segment_ids.len() > 1 {
            writer.merge(&segment_ids).wait()?;
        }
        writer.garbage_collect_files().wait()?;
        writer.wait_merging_threads()?;
        tracing::info!(segments = segment_ids.len(), "Optimized index");
        Ok(())
    }

    /// Read-side handle sharing this index location
    pub fn searcher(&self) -> Searcher {
        Searcher::new(
            self.index.clone(),
            self.schema.clone(),
            self.pipeline.clone(),
            self.config.index_path.clone(),
            self.config.hits_limit,
        )
    }

    /// Number of live documents as of the last commit
    pub fn num_docs(&self) -> Result<u64, IndexError> {
        let reader = self.index.reader()?;
        Ok(reader.searcher().num_docs())
    }

    /// Number of searchable segments as of the last commit
    pub fn num_segments(&self) -> Result<usize, IndexError> {
        Ok(self.index.searchable_segment_ids()?.len())
    }

    pub fn pipeline(&self) -> &TokenPipeline {
        &self.pipeline
    }

    pub fn index_path(&self) -> &Path {
        &self.config.index_path
    }

    /// Get the stored schema version without opening the full index
    pub fn get_stored_version(index_path: &Path) -> Result<u32, IndexError> {
        read_schema_version(index_path)
    }
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("index_path", &self.config.index_path)
            .field("schema_version", &SCHEMA_VERSION)
            .finish()
    }
}

/// Whether the directory exists and holds anything
pub(crate) fn has_index_files(index_path: &Path) -> Result<bool, IndexError> {
    if !index_path.is_dir() {
        return Ok(false);
    }
    Ok(std::fs::read_dir(index_path)?.next().is_some())
}

/// Read schema version from index directory
fn read_schema_version(index_path: &Path) -> Result<u32, IndexError> {
    let version_file = index_path.join(SCHEMA_VERSION_FILE);
    if version_file.exists() {
        let content = std::fs::read_to_string(&version_file)?;
        content.trim().parse().map_err(|_| IndexError::Corrupt {
            reason: format!("invalid schema version file {:?}", version_file),
        })
    } else {
        // No version file means version 0 (legacy)
        Ok(0)
    }
}

/// Write schema version to index directory
fn write_schema_version(index_path: &Path, version: u32) -> Result<(), IndexError> {
    let version_file: PathBuf = index_path.join(SCHEMA_VERSION_FILE);
    std::fs::write(version_file, version.to_string())?;
    Ok(())
}
