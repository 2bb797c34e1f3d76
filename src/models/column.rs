//! Column model for the connector

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name given to the single child column of a list column.
pub const LIST_ITEM_NAME: &str = "item";

/// The fixed set of column kinds a schema can declare.
///
/// List and struct kinds own their child columns exclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnKind {
    String,
    Int32,
    Int64,
    Float32,
    Float64,
    Boolean,
    Timestamp,
    List { element: Box<Column> },
    Struct { fields: Vec<Column> },
}

impl ColumnKind {
    /// A list kind whose element column has the given kind.
    pub fn list_of(element: ColumnKind) -> Self {
        ColumnKind::List {
            element: Box::new(Column::new(LIST_ITEM_NAME, element)),
        }
    }

    pub fn struct_of(fields: Vec<Column>) -> Self {
        ColumnKind::Struct { fields }
    }

    /// Whether values of this kind are offered to a sink as complex values.
    pub fn is_complex(&self) -> bool {
        matches!(self, ColumnKind::List { .. } | ColumnKind::Struct { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnKind::Int32 | ColumnKind::Int64 | ColumnKind::Float32 | ColumnKind::Float64
        )
    }

    /// Kind of the list element, if this is a list.
    pub fn element(&self) -> Option<&ColumnKind> {
        match self {
            ColumnKind::List { element } => Some(&element.kind),
            _ => None,
        }
    }

    /// Child columns of a struct, empty for every other kind.
    pub fn fields(&self) -> &[Column] {
        match self {
            ColumnKind::Struct { fields } => fields,
            _ => &[],
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::String => write!(f, "string"),
            ColumnKind::Int32 => write!(f, "int32"),
            ColumnKind::Int64 => write!(f, "int64"),
            ColumnKind::Float32 => write!(f, "float32"),
            ColumnKind::Float64 => write!(f, "float64"),
            ColumnKind::Boolean => write!(f, "boolean"),
            ColumnKind::Timestamp => write!(f, "timestamp"),
            ColumnKind::List { element } => write!(f, "list<{}>", element.kind),
            ColumnKind::Struct { fields } => {
                write!(f, "struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", field.name, field.kind)?;
                }
                write!(f, ">")
            }
        }
    }
}

/// Column model representing a field in a table
///
/// Inferred columns are always nullable; the connector never asserts non-null
/// on data it has only sampled.
///
/// # Example
///
/// ```rust
/// use docstore_connector::models::{Column, ColumnKind};
///
/// let column = Column::new("id", ColumnKind::Int64);
/// assert!(column.nullable);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column kind
    #[serde(flatten)]
    pub kind: ColumnKind,
    /// Whether the column allows NULL values (default: true)
    #[serde(default = "default_true")]
    pub nullable: bool,
}

fn default_true() -> bool {
    true
}

impl Column {
    /// Create a new nullable column with the given name and kind
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
        }
    }

    /// Child column by name, for struct columns.
    pub fn child(&self, name: &str) -> Option<&Column> {
        self.kind.fields().iter().find(|c| c.name == name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_nested_kind() {
        let kind = ColumnKind::struct_of(vec![
            Column::new("a", ColumnKind::Int32),
            Column::new("tags", ColumnKind::list_of(ColumnKind::String)),
        ]);
        assert_eq!(kind.to_string(), "struct<a:int32,tags:list<string>>");
    }

    #[test]
    fn test_serde_round_trip_keeps_children() {
        let column = Column::new(
            "addresses",
            ColumnKind::list_of(ColumnKind::struct_of(vec![Column::new(
                "city",
                ColumnKind::String,
            )])),
        );
        let json = serde_json::to_string(&column).unwrap();
        let back: Column = serde_json::from_str(&json).unwrap();
        assert_eq!(back, column);
    }

    #[test]
    fn test_nullable_defaults_to_true_when_absent() {
        let column: Column = serde_json::from_str(r#"{"name":"x","type":"int64"}"#).unwrap();
        assert_eq!(column.kind, ColumnKind::Int64);
        assert!(column.nullable);
    }

    #[test]
    fn test_complex_kinds() {
        assert!(ColumnKind::list_of(ColumnKind::Int32).is_complex());
        assert!(ColumnKind::struct_of(Vec::new()).is_complex());
        assert!(!ColumnKind::Timestamp.is_complex());
        assert_eq!(
            ColumnKind::list_of(ColumnKind::Int32).element(),
            Some(&ColumnKind::Int32)
        );
    }
}
