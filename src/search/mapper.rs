//! Projection between [`Record`] and tantivy documents

use tantivy::schema::{Field, Value};
use tantivy::TantivyDocument;

use super::error::IndexError;
use super::schema::SchemaFields;
use crate::core::Record;

/// Maps records to documents and back using the stored field values
#[derive(Debug, Clone, Copy)]
pub struct Mapper {
    fields: SchemaFields,
}

impl Mapper {
    pub fn new(fields: SchemaFields) -> Self {
        Self { fields }
    }

    /// Build the index document for a record
    pub fn to_document(&self, record: &Record) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.fields.id, record.id.to_string());
        doc.add_text(self.fields.title, &record.title);
        doc.add_text(self.fields.content, &record.content);
        doc
    }

    /// Rebuild a record from a stored document.
    ///
    /// A missing or non-numeric id means the stored document is corrupt.
    pub fn from_document(&self, doc: &TantivyDocument) -> Result<Record, IndexError> {
        let raw_id = stored_text(doc, self.fields.id).ok_or_else(|| IndexError::Corrupt {
            reason: "document has no stored id".to_string(),
        })?;
        let id = raw_id.parse::<i64>().map_err(|e| IndexError::Corrupt {
            reason: format!("stored id '{}' is not an integer: {}", raw_id, e),
        })?;

        Ok(Record {
            id,
            title: stored_text(doc, self.fields.title).unwrap_or_default().to_string(),
            content: stored_text(doc, self.fields.content).unwrap_or_default().to_string(),
        })
    }

    /// Map a batch of documents, skipping (and logging) corrupt ones
    pub fn from_documents<'a, I>(&self, docs: I) -> Vec<Record>
    where
        I: IntoIterator<Item = &'a TantivyDocument>,
    {
        docs.into_iter()
            .filter_map(|doc| match self.from_document(doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping unreadable document: {}", e);
                    None
                }
            })
            .collect()
    }
}

fn stored_text(doc: &TantivyDocument, field: Field) -> Option<&str> {
    doc.get_first(field).and_then(|v| v.as_str())
}
