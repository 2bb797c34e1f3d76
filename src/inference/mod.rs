//! Schema inference from sampled documents
//!
//! A bounded sample of documents is folded, one document at a time, into a
//! running set of field types. Each new observation of a field is merged into
//! what was seen before using the widening rules in [`merge`]. Inference never
//! fails on document content: values of unrecognised runtime types are treated
//! as strings. Only errors from the document source itself are propagated.

pub mod merge;

pub use merge::{InferredType, ScalarKind};

use crate::cursor::CursorResult;
use crate::models::{Column, Document, Schema};
use tracing::{debug, info};

/// Number of documents sampled when no sample size is configured.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Incrementally builds a schema from documents.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, InferredType)>,
    documents: usize,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one document into the schema.
    pub fn add_document(&mut self, document: &Document) {
        for (name, value) in document.iter() {
            merge::merge_field(&mut self.fields, name, InferredType::of(value));
        }
        self.documents += 1;
    }

    /// Number of documents folded so far.
    pub fn documents_seen(&self) -> usize {
        self.documents
    }

    /// One nullable column per field, in first-seen order.
    pub fn finish(self) -> Schema {
        Schema::from_columns(
            self.fields
                .into_iter()
                .map(|(name, t)| Column::new(name, t.to_column_kind()))
                .collect(),
        )
    }
}

/// Infer a schema from at most `sample_size` documents of a fallible source.
pub fn infer_schema<I, E>(documents: I, sample_size: usize) -> Result<Schema, E>
where
    I: IntoIterator<Item = Result<Document, E>>,
{
    let mut builder = SchemaBuilder::new();
    for document in documents.into_iter().take(sample_size) {
        builder.add_document(&document?);
    }
    debug!(
        "Inferred schema from {} documents",
        builder.documents_seen()
    );
    Ok(builder.finish())
}

/// Infer a schema from at most `sample_size` in-memory documents.
pub fn infer_from_documents<'d, I>(documents: I, sample_size: usize) -> Schema
where
    I: IntoIterator<Item = &'d Document>,
{
    let mut builder = SchemaBuilder::new();
    for document in documents.into_iter().take(sample_size) {
        builder.add_document(document);
    }
    builder.finish()
}

/// Produces a schema from a stream of sampled documents.
pub trait SchemaProvider: Send + Sync {
    fn get_schema(
        &self,
        documents: &mut dyn Iterator<Item = CursorResult<Document>>,
    ) -> CursorResult<Schema>;
}

/// Sampling schema provider using the merge rules of this module.
#[derive(Debug, Clone)]
pub struct DefaultSchemaProvider {
    sample_size: usize,
}

impl DefaultSchemaProvider {
    pub fn new(sample_size: usize) -> Self {
        Self { sample_size }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
}

impl Default for DefaultSchemaProvider {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}

impl SchemaProvider for DefaultSchemaProvider {
    fn get_schema(
        &self,
        documents: &mut dyn Iterator<Item = CursorResult<Document>>,
    ) -> CursorResult<Schema> {
        let schema = infer_schema(documents, self.sample_size)?;
        info!("Inferred {} columns", schema.len());
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnKind, Value};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn test_int_then_float_widens_to_float64() {
        let docs = [doc(json!({"a": 1})), doc(json!({"a": 1.0}))];
        let schema = infer_from_documents(&docs, DEFAULT_SAMPLE_SIZE);
        assert_eq!(schema.kind_of("a"), Some(&ColumnKind::Float64));
    }

    #[test]
    fn test_empty_list_then_ints() {
        let docs = [doc(json!({"a": []})), doc(json!({"a": [5]}))];
        let schema = infer_from_documents(&docs, DEFAULT_SAMPLE_SIZE);
        assert_eq!(
            schema.kind_of("a"),
            Some(&ColumnKind::list_of(ColumnKind::Int32))
        );
    }

    #[test]
    fn test_columns_in_first_seen_order() {
        let docs = [
            doc(json!({"b": 1, "a": "x"})),
            doc(json!({"c": true, "a": "y"})),
        ];
        let schema = infer_from_documents(&docs, DEFAULT_SAMPLE_SIZE);
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert!(schema.columns.iter().all(|c| c.nullable));
    }

    #[test]
    fn test_sample_limit_is_honoured() {
        let docs = [doc(json!({"a": 1})), doc(json!({"a": "late"}))];
        let schema = infer_from_documents(&docs, 1);
        assert_eq!(schema.kind_of("a"), Some(&ColumnKind::Int32));
    }

    #[test]
    fn test_only_nulls_become_string() {
        let docs = [doc(json!({"a": null}))];
        let schema = infer_from_documents(&docs, DEFAULT_SAMPLE_SIZE);
        assert_eq!(schema.kind_of("a"), Some(&ColumnKind::String));
    }

    #[test]
    fn test_source_errors_propagate() {
        let source: Vec<Result<Document, String>> =
            vec![Ok(doc(json!({"a": 1}))), Err("boom".to_string())];
        assert_eq!(infer_schema(source, 10), Err("boom".to_string()));
    }

    #[test]
    fn test_errors_past_the_sample_are_not_read() {
        let source: Vec<Result<Document, String>> =
            vec![Ok(doc(json!({"a": 1}))), Err("boom".to_string())];
        assert!(infer_schema(source, 1).is_ok());
    }

    #[test]
    fn test_default_provider_over_mixed_documents() {
        let struct1 = Document::new()
            .with("struct_col1", 1)
            .with("struct_col2", "string")
            .with("struct_col3", 1.0f64);
        let struct2 = Document::new()
            .with("struct_col1", 1)
            .with("struct_col2", "string")
            .with("struct_col3", 1)
            .with("struct_col4", 2.0f32);
        let list = Value::Array(vec![Value::from("test"); 3]);

        let docs = vec![
            Document::new()
                .with("col1", 1)
                .with("col2", "string")
                .with("col3", 1.0f64)
                .with("col5", list.clone())
                .with("col6", struct1),
            Document::new()
                .with("col1", 1)
                .with("col2", "string")
                .with("col4", 1.0f32)
                .with("col6", struct2),
            Document::new()
                .with("col1", 1)
                .with("col2", "string")
                .with("col4", 1)
                .with("col5", list),
        ];

        let provider = DefaultSchemaProvider::default();
        let mut source = docs.into_iter().map(Ok);
        let schema = provider.get_schema(&mut source).unwrap();

        assert_eq!(schema.len(), 6);
        assert_eq!(schema.kind_of("col1"), Some(&ColumnKind::Int32));
        assert_eq!(schema.kind_of("col2"), Some(&ColumnKind::String));
        assert_eq!(schema.kind_of("col3"), Some(&ColumnKind::Float64));
        assert_eq!(schema.kind_of("col4"), Some(&ColumnKind::Float64));
        assert_eq!(
            schema.kind_of("col5"),
            Some(&ColumnKind::list_of(ColumnKind::String))
        );

        let col6 = schema.column("col6").unwrap();
        assert_eq!(col6.child("struct_col1").unwrap().kind, ColumnKind::Int32);
        assert_eq!(col6.child("struct_col2").unwrap().kind, ColumnKind::String);
        assert_eq!(col6.child("struct_col3").unwrap().kind, ColumnKind::Float64);
        assert_eq!(col6.child("struct_col4").unwrap().kind, ColumnKind::Float32);
    }

    #[test]
    fn test_unsupported_value_type_becomes_string() {
        let doc = Document::new().with("unsupported_col1", Value::Binary(vec![1, 2, 3]));
        let schema = infer_from_documents(&[doc], DEFAULT_SAMPLE_SIZE);
        assert_eq!(schema.len(), 1);
        assert_eq!(
            schema.kind_of("unsupported_col1"),
            Some(&ColumnKind::String)
        );
    }
}
