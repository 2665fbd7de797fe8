//! Static field schema
//!
//! Every indexed field is declared once in [`FIELD_SPECS`] with its storage
//! and analysis policy. The tantivy schema is derived from that table, and an
//! existing index is checked against the same table when it is opened.

use tantivy::schema::{
    Field, FieldEntry, FieldType, IndexRecordOption, Schema, TextFieldIndexing, TextOptions,
};

use super::error::IndexError;
use super::tokenizer::TOKENIZER_NAME;

pub const ID_FIELD: &str = "id";
pub const TITLE_FIELD: &str = "title";
pub const CONTENT_FIELD: &str = "content";

/// tantivy's built-in tokenizer that keeps the whole value as one term
const RAW_TOKENIZER: &str = "raw";

/// How a field's value is turned into terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Indexed verbatim as a single term; only exact matches hit
    ExactMatch,
    /// Run through the token pipeline
    Analyzed,
}

/// Declaration of one document field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub stored: bool,
    pub policy: FieldPolicy,
}

/// All document fields. Stored values are always the original strings.
pub const FIELD_SPECS: [FieldSpec; 3] = [
    FieldSpec {
        name: ID_FIELD,
        stored: true,
        policy: FieldPolicy::ExactMatch,
    },
    FieldSpec {
        name: TITLE_FIELD,
        stored: true,
        policy: FieldPolicy::Analyzed,
    },
    FieldSpec {
        name: CONTENT_FIELD,
        stored: true,
        policy: FieldPolicy::Analyzed,
    },
];

impl FieldSpec {
    fn tokenizer(&self) -> &'static str {
        match self.policy {
            FieldPolicy::ExactMatch => RAW_TOKENIZER,
            FieldPolicy::Analyzed => TOKENIZER_NAME,
        }
    }

    fn text_options(&self) -> TextOptions {
        let record_option = match self.policy {
            FieldPolicy::ExactMatch => IndexRecordOption::Basic,
            FieldPolicy::Analyzed => IndexRecordOption::WithFreqsAndPositions,
        };
        let options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(self.tokenizer())
                .set_index_option(record_option),
        );
        if self.stored {
            options.set_stored()
        } else {
            options
        }
    }

    /// Check an existing field against this declaration
    fn check(&self, entry: &FieldEntry) -> Result<(), IndexError> {
        let incompatible = |reason: &str| IndexError::SchemaIncompatible {
            field: self.name.to_string(),
            reason: reason.to_string(),
        };

        let FieldType::Str(options) = entry.field_type() else {
            return Err(incompatible("not a text field"));
        };
        if options.is_stored() != self.stored {
            return Err(incompatible("stored flag differs"));
        }
        let Some(indexing) = options.get_indexing_options() else {
            return Err(incompatible("field is not indexed"));
        };
        if indexing.tokenizer() != self.tokenizer() {
            return Err(incompatible(&format!(
                "tokenizer is '{}', expected '{}'",
                indexing.tokenizer(),
                self.tokenizer()
            )));
        }
        Ok(())
    }
}

/// Resolved field handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaFields {
    pub id: Field,
    pub title: Field,
    pub content: Field,
}

/// The tantivy schema plus resolved field handles
#[derive(Debug, Clone)]
pub struct IndexSchema {
    schema: Schema,
    fields: SchemaFields,
}

impl IndexSchema {
    /// Build a fresh schema from [`FIELD_SPECS`]
    pub fn build() -> Self {
        let [id, title, content] = FIELD_SPECS;
        let mut builder = Schema::builder();
        let fields = SchemaFields {
            id: builder.add_text_field(id.name, id.text_options()),
            title: builder.add_text_field(title.name, title.text_options()),
            content: builder.add_text_field(content.name, content.text_options()),
        };
        Self {
            schema: builder.build(),
            fields,
        }
    }

    /// Validate the schema of an existing index
    pub fn from_existing(schema: Schema) -> Result<Self, IndexError> {
        for spec in &FIELD_SPECS {
            let field = schema
                .get_field(spec.name)
                .map_err(|_| IndexError::SchemaIncompatible {
                    field: spec.name.to_string(),
                    reason: "missing".to_string(),
                })?;
            spec.check(schema.get_field_entry(field))?;
        }
        let fields = Self::resolve_fields(&schema)?;
        Ok(Self { schema, fields })
    }

    fn resolve_fields(schema: &Schema) -> Result<SchemaFields, IndexError> {
        Ok(SchemaFields {
            id: schema.get_field(ID_FIELD)?,
            title: schema.get_field(TITLE_FIELD)?,
            content: schema.get_field(CONTENT_FIELD)?,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn fields(&self) -> SchemaFields {
        self.fields
    }

    /// Look up a field by name
    pub fn resolve(&self, name: &str) -> Option<(Field, FieldPolicy)> {
        let spec = FIELD_SPECS.iter().find(|spec| spec.name == name)?;
        let field = self.schema.get_field(spec.name).ok()?;
        Some((field, spec.policy))
    }

    /// Fields searched when a query names no field
    pub fn analyzed_fields(&self) -> Vec<Field> {
        FIELD_SPECS
            .iter()
            .filter(|spec| spec.policy == FieldPolicy::Analyzed)
            .filter_map(|spec| self.schema.get_field(spec.name).ok())
            .collect()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        FIELD_SPECS.iter().map(|spec| spec.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tantivy::schema::{STORED, TEXT};

    #[test]
    fn test_field_specs_are_unique() {
        let names: HashSet<_> = FIELD_SPECS.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), FIELD_SPECS.len());
    }

    #[test]
    fn test_build_schema() {
        let schema = IndexSchema::build();
        assert_eq!(schema.field_names(), vec!["id", "title", "content"]);
        assert_eq!(
            schema.analyzed_fields(),
            vec![schema.fields().title, schema.fields().content]
        );
        assert_eq!(
            schema.resolve("id"),
            Some((schema.fields().id, FieldPolicy::ExactMatch))
        );
        assert!(schema.resolve("Title").is_none());
    }

    #[test]
    fn test_built_schema_validates() {
        let built = IndexSchema::build();
        let validated = IndexSchema::from_existing(built.schema().clone()).unwrap();
        assert_eq!(validated.fields(), built.fields());
    }

    #[test]
    fn test_incompatible_tokenizer_rejected() {
        let mut builder = Schema::builder();
        builder.add_text_field(ID_FIELD, tantivy::schema::STRING | STORED);
        builder.add_text_field(TITLE_FIELD, TEXT | STORED);
        builder.add_text_field(CONTENT_FIELD, TEXT | STORED);

        let err = IndexSchema::from_existing(builder.build()).unwrap_err();
        assert!(matches!(
            err,
            IndexError::SchemaIncompatible { ref field, .. } if field == TITLE_FIELD
        ));
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut builder = Schema::builder();
        builder.add_text_field(ID_FIELD, tantivy::schema::STRING | STORED);

        let err = IndexSchema::from_existing(builder.build()).unwrap_err();
        assert!(matches!(err, IndexError::SchemaIncompatible { .. }));
    }
}
