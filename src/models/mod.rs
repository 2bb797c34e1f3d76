//! Models module for the connector
//!
//! Defines the document value model read from the store and the typed
//! column schema the connector exposes to the query engine.

pub mod column;
pub mod document;
pub mod schema;

pub use column::{Column, ColumnKind, LIST_ITEM_NAME};
pub use document::{Document, ObjectId, Timestamp, Value};
pub use schema::{SOURCE_TABLE_PROPERTY, Schema};
