//! Document model for the connector
//!
//! Documents are owned by the backing store and are read-only to the connector.
//! A [`Document`] keeps its fields in insertion order, which is the order the
//! store returned them in and the order schema inference reports first-seen columns.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

/// A 12-byte store-native object identifier.
///
/// Renders as 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for ObjectId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 24 || !s.is_ascii() {
            return Err(format!("Invalid object id '{}': expected 24 hex characters", s));
        }
        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|e| format!("Invalid object id '{}': {}", s, e))?;
        }
        Ok(Self(bytes))
    }
}

/// Store-native replication timestamp: seconds since the epoch plus an ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    pub time: u32,
    /// Ordinal of the operation within that second
    pub increment: u32,
}

impl Timestamp {
    pub fn new(time: u32, increment: u32) -> Self {
        Self { time, increment }
    }

    /// The instant this timestamp denotes, at millisecond precision.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(i64::from(self.time) * 1_000)
    }
}

/// A dynamically typed document field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Arbitrary-precision decimal kept as its canonical text
    Decimal(String),
    String(String),
    ObjectId(ObjectId),
    Timestamp(Timestamp),
    DateTime(DateTime<Utc>),
    Binary(Vec<u8>),
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the runtime type, used in log and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::ObjectId(_) => "objectId",
            Value::Timestamp(_) => "timestamp",
            Value::DateTime(_) => "date",
            Value::Binary(_) => "binary",
            Value::Array(_) => "array",
            Value::Document(_) => "document",
        }
    }

    /// Extended-JSON rendering of this value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int32(i) => json!(i),
            Value::Int64(i) => json!(i),
            Value::Float32(f) => json!(f),
            Value::Float64(f) => json!(f),
            Value::Decimal(d) => json!({ "$numberDecimal": d }),
            Value::String(s) => json!(s),
            Value::ObjectId(oid) => json!({ "$oid": oid.to_string() }),
            Value::Timestamp(ts) => json!({ "$timestamp": { "t": ts.time, "i": ts.increment } }),
            Value::DateTime(dt) => json!({ "$date": dt.to_rfc3339() }),
            Value::Binary(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                json!({ "$binary": hex })
            }
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Document(doc) => doc.to_json(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int32(i) => write!(f, "{}", i),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float32(v) => write!(f, "{:?}", v),
            Value::Float64(v) => write!(f, "{:?}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::ObjectId(oid) => write!(f, "{}", oid),
            Value::Timestamp(ts) => write!(f, "Timestamp({}, {})", ts.time, ts.increment),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Binary(_) | Value::Array(_) | Value::Document(_) => {
                write!(f, "{}", self.to_json())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float32(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => Value::Int32(small),
                        Err(_) => Value::Int64(i),
                    }
                } else if n.is_u64() {
                    Value::Decimal(n.to_string())
                } else {
                    Value::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                if map.len() == 1
                    && let Some((key, inner)) = map.iter().next()
                    && let Some(special) = extended_json(key, inner)
                {
                    return special;
                }
                Value::Document(
                    map.into_iter()
                        .map(|(k, v)| (k, Value::from(v)))
                        .collect(),
                )
            }
        }
    }
}

/// Decode the single-key extended-JSON wrappers (`$oid`, `$date`, ...).
fn extended_json(key: &str, inner: &serde_json::Value) -> Option<Value> {
    match key {
        "$oid" => inner.as_str()?.parse().ok().map(Value::ObjectId),
        "$date" => match inner {
            serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| Value::DateTime(dt.with_timezone(&Utc))),
            serde_json::Value::Number(n) => {
                DateTime::from_timestamp_millis(n.as_i64()?).map(Value::DateTime)
            }
            serde_json::Value::Object(o) => {
                let millis = o.get("$numberLong")?.as_str()?.parse().ok()?;
                DateTime::from_timestamp_millis(millis).map(Value::DateTime)
            }
            _ => None,
        },
        "$timestamp" => {
            let time = u32::try_from(inner.get("t")?.as_u64()?).ok()?;
            let increment = u32::try_from(inner.get("i")?.as_u64()?).ok()?;
            Some(Value::Timestamp(Timestamp::new(time, increment)))
        }
        "$numberDecimal" => Some(Value::Decimal(inner.as_str()?.to_string())),
        "$numberLong" => inner.as_str()?.parse().ok().map(Value::Int64),
        _ => None,
    }
}

/// An insertion-ordered mapping from field name to [`Value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing (in place) and returning any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Builder-style [`Document::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Case-insensitive lookup; an exact match wins over a case-folded one.
    pub fn get_ignore_case(&self, key: &str) -> Option<&Value> {
        self.get(key).or_else(|| {
            self.fields
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match Value::from(value) {
            Value::Document(doc) => Ok(doc),
            other => Err(format!("Expected a JSON object, found {}", other.type_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order_and_replaces_in_place() {
        let mut doc = Document::new().with("b", 1).with("a", "x");
        assert_eq!(doc.insert("b", 2), Some(Value::Int32(1)));
        let keys: Vec<&str> = doc.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(doc.get("b"), Some(&Value::Int32(2)));
    }

    #[test]
    fn test_get_ignore_case_prefers_exact_match() {
        let doc = Document::new().with("NAME", "upper").with("name", "lower");
        assert_eq!(doc.get_ignore_case("name"), Some(&Value::from("lower")));
        assert_eq!(doc.get_ignore_case("Name"), Some(&Value::from("upper")));
        assert_eq!(doc.get_ignore_case("missing"), None);
    }

    #[test]
    fn test_object_id_hex() {
        let oid: ObjectId = "5f1d7f8e9a0b1c2d3e4f5a6b".parse().unwrap();
        assert_eq!(oid.to_string(), "5f1d7f8e9a0b1c2d3e4f5a6b");
        assert!("not-an-id".parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(Value::from(json!(42)), Value::Int32(42));
        assert_eq!(
            Value::from(json!(123456789012i64)),
            Value::Int64(123456789012)
        );
        assert_eq!(Value::from(json!(1.5)), Value::Float64(1.5));
        assert_eq!(
            Value::from(json!(u64::MAX)),
            Value::Decimal(u64::MAX.to_string())
        );
    }

    #[test]
    fn test_from_extended_json() {
        let doc = Document::try_from(json!({
            "_id": { "$oid": "5f1d7f8e9a0b1c2d3e4f5a6b" },
            "ts": { "$timestamp": { "t": 100, "i": 2 } },
            "created": { "$date": "2024-01-02T03:04:05Z" },
            "price": { "$numberDecimal": "12.50" },
            "nested": { "a": 1, "b": 2 }
        }))
        .unwrap();

        assert!(matches!(doc.get("_id"), Some(Value::ObjectId(_))));
        assert_eq!(
            doc.get("ts"),
            Some(&Value::Timestamp(Timestamp::new(100, 2)))
        );
        assert!(matches!(doc.get("created"), Some(Value::DateTime(_))));
        assert_eq!(doc.get("price"), Some(&Value::Decimal("12.50".to_string())));
        assert!(matches!(doc.get("nested"), Some(Value::Document(d)) if d.len() == 2));
    }

    #[test]
    fn test_display_renders_floats_with_fraction() {
        assert_eq!(Value::Float64(1.0).to_string(), "1.0");
        assert_eq!(Value::Int32(42).to_string(), "42");
        assert_eq!(
            Value::Array(vec![Value::from("a"), Value::Int32(1)]).to_string(),
            r#"["a",1]"#
        );
    }

    #[test]
    fn test_try_from_non_object_fails() {
        assert!(Document::try_from(json!([1, 2])).is_err());
    }
}
