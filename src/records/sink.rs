//! Row-oriented output contract of a scan

use crate::models::{Document, Value};

/// Error raised by a sink while accepting a value.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Receives coerced values row by row.
///
/// `offer` returns whether the row still matches the sink's own residual
/// filtering; a `false` abandons the row.
pub trait BlockSink {
    fn offer(&mut self, field: &str, row: usize, value: Value) -> Result<bool, SinkError>;

    /// Offer a list or struct value.
    fn offer_complex(&mut self, field: &str, row: usize, value: Value) -> Result<bool, SinkError> {
        self.offer(field, row, value)
    }

    /// Called once per document after its fields were offered.
    fn end_row(&mut self, _row: usize, _accepted: bool) {}
}

/// Sink collecting accepted rows in memory, with an optional equality filter.
#[derive(Debug, Default)]
pub struct VecSink {
    rows: Vec<Document>,
    current: Document,
    filter: Option<(String, Value)>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only rows whose `field` equals `value` after coercion.
    pub fn with_filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filter = Some((field.into(), value));
        self
    }

    pub fn rows(&self) -> &[Document] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Document> {
        self.rows
    }
}

impl BlockSink for VecSink {
    fn offer(&mut self, field: &str, _row: usize, value: Value) -> Result<bool, SinkError> {
        let matched = match &self.filter {
            Some((name, expected)) if name == field => &value == expected,
            _ => true,
        };
        self.current.insert(field, value);
        Ok(matched)
    }

    fn end_row(&mut self, _row: usize, accepted: bool) {
        let row = std::mem::take(&mut self.current);
        if accepted {
            self.rows.push(row);
        }
    }
}
