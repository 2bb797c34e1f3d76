//! Docstore Connector - typed tables over schema-less document stores
//!
//! Provides:
//! - Multi-tenant collection patterns mapping many physical collections onto one logical table
//! - A lazily chained cursor over several collections
//! - Schema inference from sampled documents with type widening
//! - Read-time value coercion into declared column kinds
//! - Table metadata resolution and row scans into an output sink
//!
//! ```
//! use docstore_connector::glob::PatternSet;
//!
//! let patterns = PatternSet::parse("Foo_{{Id}}");
//! assert_eq!(patterns.canonicalize("Foo_1"), "Foo_Id");
//! assert_eq!(patterns.canonicalize("Foobar"), "Foobar");
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod coercion;
pub mod config;
pub mod cursor;
pub mod glob;
pub mod inference;
pub mod metadata;
pub mod models;
pub mod records;
pub mod store;

// Re-export commonly used types
pub use coercion::coerce;
pub use config::{ConfigError, ConnectorConfig};
pub use cursor::{ChainedCursor, CursorError, CursorResult};
pub use glob::{CollectionPattern, PatternSet};
pub use inference::{DefaultSchemaProvider, SchemaBuilder, SchemaProvider, infer_schema};
pub use metadata::{
    CatalogTable, MetadataError, MetadataHandler, MetadataResult, Split, SupplementalMetadata,
    TableInfo,
};
pub use models::{Column, ColumnKind, Document, ObjectId, Schema, Timestamp, Value};
pub use records::{
    BlockSink, CancellationToken, QueryStatus, RecordError, RecordHandler, RecordResult,
    ScanRequest, ScanSummary, VecSink,
};
pub use store::{
    ConnectionCache, DocumentIterator, DocumentStore, FindOptions, JsonLinesStore, MemoryStore,
    StoreError, StoreResult,
};
