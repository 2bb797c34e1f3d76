//! Inferred field types and the widening rules used to merge them

use crate::models::{Column, ColumnKind, Value};
use tracing::debug;

/// Scalar kinds inference can observe directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int32,
    Int64,
    Float32,
    Float64,
    Boolean,
    Timestamp,
}

impl ScalarKind {
    fn is_integer(self) -> bool {
        matches!(self, ScalarKind::Int32 | ScalarKind::Int64)
    }

    fn is_float(self) -> bool {
        matches!(self, ScalarKind::Float32 | ScalarKind::Float64)
    }

    fn to_column_kind(self) -> ColumnKind {
        match self {
            ScalarKind::String => ColumnKind::String,
            ScalarKind::Int32 => ColumnKind::Int32,
            ScalarKind::Int64 => ColumnKind::Int64,
            ScalarKind::Float32 => ColumnKind::Float32,
            ScalarKind::Float64 => ColumnKind::Float64,
            ScalarKind::Boolean => ColumnKind::Boolean,
            ScalarKind::Timestamp => ColumnKind::Timestamp,
        }
    }
}

/// Type observed for a field across the documents seen so far.
///
/// `Unobserved` stands for "no evidence yet" (a null value, or the element of
/// an empty list) and yields to whatever is observed later.
#[derive(Debug, Clone, PartialEq)]
pub enum InferredType {
    Unobserved,
    Scalar(ScalarKind),
    List(Box<InferredType>),
    Struct(Vec<(String, InferredType)>),
}

impl InferredType {
    /// Type of a single runtime value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => InferredType::Unobserved,
            Value::Bool(_) => InferredType::Scalar(ScalarKind::Boolean),
            Value::Int32(_) => InferredType::Scalar(ScalarKind::Int32),
            Value::Int64(i) => {
                if i32::try_from(*i).is_ok() {
                    InferredType::Scalar(ScalarKind::Int32)
                } else {
                    InferredType::Scalar(ScalarKind::Int64)
                }
            }
            Value::Float32(_) => InferredType::Scalar(ScalarKind::Float32),
            Value::Float64(_) => InferredType::Scalar(ScalarKind::Float64),
            Value::String(_) => InferredType::Scalar(ScalarKind::String),
            Value::Timestamp(_) | Value::DateTime(_) => InferredType::Scalar(ScalarKind::Timestamp),
            Value::Array(items) => InferredType::List(Box::new(
                items
                    .iter()
                    .map(InferredType::of)
                    .fold(InferredType::Unobserved, merge),
            )),
            Value::Document(doc) => {
                let mut fields: Vec<(String, InferredType)> = Vec::with_capacity(doc.len());
                for (name, field_value) in doc.iter() {
                    merge_field(&mut fields, name, InferredType::of(field_value));
                }
                InferredType::Struct(fields)
            }
            other => {
                debug!(
                    "Unsupported value type {}, falling back to string",
                    other.type_name()
                );
                InferredType::Scalar(ScalarKind::String)
            }
        }
    }

    /// Column kind for this type. Anything still unobserved becomes a string.
    pub fn to_column_kind(&self) -> ColumnKind {
        match self {
            InferredType::Unobserved => ColumnKind::String,
            InferredType::Scalar(kind) => kind.to_column_kind(),
            InferredType::List(element) => ColumnKind::list_of(element.to_column_kind()),
            InferredType::Struct(fields) => ColumnKind::struct_of(
                fields
                    .iter()
                    .map(|(name, t)| Column::new(name.clone(), t.to_column_kind()))
                    .collect(),
            ),
        }
    }
}

/// Merge two observations of the same field into their common representation.
///
/// - an unobserved side yields to the other side
/// - identical kinds are kept
/// - two integer widths widen to int64, two float widths to float64, and an
///   integer against a float to float64
/// - lists merge their element types
/// - structs union their children by name, merging shared children
/// - every other combination resolves to string
pub fn merge(current: InferredType, observed: InferredType) -> InferredType {
    use InferredType::*;
    match (current, observed) {
        // Empty lists stay open too: `[]` then `[5]` is list<int32>, not list<string>
        (Unobserved, other) | (other, Unobserved) => other,
        (Scalar(a), Scalar(b)) => Scalar(merge_scalar(a, b)),
        (List(a), List(b)) => List(Box::new(merge(*a, *b))),
        (Struct(mut a), Struct(b)) => {
            for (name, t) in b {
                merge_field(&mut a, &name, t);
            }
            Struct(a)
        }
        _ => Scalar(ScalarKind::String),
    }
}

fn merge_scalar(a: ScalarKind, b: ScalarKind) -> ScalarKind {
    if a == b {
        return a;
    }
    if a.is_integer() && b.is_integer() {
        ScalarKind::Int64
    } else if (a.is_integer() || a.is_float()) && (b.is_integer() || b.is_float()) {
        ScalarKind::Float64
    } else {
        ScalarKind::String
    }
}

/// Merge `observed` into the entry for `name`, appending it if new.
pub(crate) fn merge_field(
    fields: &mut Vec<(String, InferredType)>,
    name: &str,
    observed: InferredType,
) {
    match fields.iter_mut().find(|(existing, _)| existing == name) {
        Some((_, slot)) => {
            let current = std::mem::replace(slot, InferredType::Unobserved);
            *slot = merge(current, observed);
        }
        None => fields.push((name.to_string(), observed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, ObjectId};

    fn scalar(kind: ScalarKind) -> InferredType {
        InferredType::Scalar(kind)
    }

    #[test]
    fn test_numeric_widening() {
        use ScalarKind::*;
        assert_eq!(merge(scalar(Int32), scalar(Int64)), scalar(Int64));
        assert_eq!(merge(scalar(Int32), scalar(Float64)), scalar(Float64));
        assert_eq!(merge(scalar(Float32), scalar(Float64)), scalar(Float64));
        assert_eq!(merge(scalar(Int64), scalar(Float32)), scalar(Float64));
        assert_eq!(merge(scalar(Float32), scalar(Float32)), scalar(Float32));
    }

    #[test]
    fn test_numeric_merge_is_commutative() {
        use ScalarKind::*;
        let kinds = [Int32, Int64, Float32, Float64];
        for a in kinds {
            for b in kinds {
                assert_eq!(merge(scalar(a), scalar(b)), merge(scalar(b), scalar(a)));
            }
        }
    }

    #[test]
    fn test_incompatible_kinds_become_string() {
        use ScalarKind::*;
        assert_eq!(merge(scalar(Int32), scalar(String)), scalar(String));
        assert_eq!(merge(scalar(Boolean), scalar(Timestamp)), scalar(String));
        assert_eq!(
            merge(InferredType::Struct(Vec::new()), scalar(Int32)),
            scalar(String)
        );
        assert_eq!(
            merge(InferredType::List(Box::new(scalar(Int32))), scalar(Int32)),
            scalar(String)
        );
    }

    #[test]
    fn test_unobserved_yields() {
        let empty_list = InferredType::of(&Value::Array(Vec::new()));
        let ints = InferredType::of(&Value::Array(vec![Value::Int32(5)]));
        assert_eq!(
            merge(empty_list.clone(), ints.clone()),
            InferredType::List(Box::new(scalar(ScalarKind::Int32)))
        );
        assert_eq!(merge(ints.clone(), empty_list), ints);
        assert_eq!(
            merge(InferredType::of(&Value::Null), scalar(ScalarKind::Boolean)),
            scalar(ScalarKind::Boolean)
        );
    }

    #[test]
    fn test_struct_union() {
        let a = InferredType::of(&Value::Document(Document::new().with("x", 1).with("y", "s")));
        let b = InferredType::of(&Value::Document(
            Document::new().with("z", true).with("x", 1.5),
        ));
        assert_eq!(
            merge(a, b),
            InferredType::Struct(vec![
                ("x".to_string(), scalar(ScalarKind::Float64)),
                ("y".to_string(), scalar(ScalarKind::String)),
                ("z".to_string(), scalar(ScalarKind::Boolean)),
            ])
        );
    }

    #[test]
    fn test_value_types() {
        assert_eq!(
            InferredType::of(&Value::Int64(7)),
            scalar(ScalarKind::Int32)
        );
        assert_eq!(
            InferredType::of(&Value::Int64(i64::from(i32::MAX) + 1)),
            scalar(ScalarKind::Int64)
        );
        assert_eq!(
            InferredType::of(&Value::ObjectId(ObjectId::from_bytes([1; 12]))),
            scalar(ScalarKind::String)
        );
        assert_eq!(
            InferredType::of(&Value::Array(vec![Value::Int32(1), Value::Float64(2.0)])),
            InferredType::List(Box::new(scalar(ScalarKind::Float64)))
        );
    }

    #[test]
    fn test_unobserved_list_element_defaults_to_string() {
        let kind = InferredType::of(&Value::Array(Vec::new())).to_column_kind();
        assert_eq!(kind, ColumnKind::list_of(ColumnKind::String));
    }
}
