//! Schema model: an ordered set of uniquely named columns

use super::column::{Column, ColumnKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema metadata key naming the logical table a schema was resolved for.
pub const SOURCE_TABLE_PROPERTY: &str = "sourceTable";

/// Ordered set of columns.
///
/// Column order is first-seen order across the documents a schema was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Self {
        let mut schema = Self::new();
        for column in columns {
            schema.upsert(column);
        }
        schema
    }

    /// Add a column, or replace the kind of an existing column of the same name
    /// while keeping its position.
    pub fn upsert(&mut self, column: Column) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<&ColumnKind> {
        self.column(name).map(|c| &c.kind)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Logical table recorded under [`SOURCE_TABLE_PROPERTY`], if any.
    pub fn source_table(&self) -> Option<&str> {
        self.metadata.get(SOURCE_TABLE_PROPERTY).map(String::as_str)
    }
}
