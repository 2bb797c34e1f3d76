//! Document store abstraction
//!
//! The connector only needs two capabilities from a backing document store:
//! catalog listing (databases and the collections inside them) and a
//! forward-only document query. Connection management, credentials and
//! retries belong to the store implementation.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`]: ordered in-memory collections, used by tests and embedders
//! - [`JsonLinesStore`]: a directory of newline-delimited JSON files, used by the CLI

use crate::models::{Document, Value};

pub mod connection;
pub mod jsonl;
pub mod memory;

pub use connection::ConnectionCache;
pub use jsonl::JsonLinesStore;
pub use memory::{CursorStats, MemoryStore};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to connect to the store
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Database does not exist
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    /// Collection does not exist
    #[error("Collection not found: {database}.{collection}")]
    CollectionNotFound {
        database: String,
        collection: String,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored document could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Releasing a cursor failed
    #[error("Close failed: {0}")]
    CloseFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Options for a single collection query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Native query filter
    pub filter: Option<Document>,
    /// Field projection (`{field: 1}` keeps only the listed fields)
    pub projection: Option<Document>,
    /// Documents fetched per round trip
    pub batch_size: Option<usize>,
    /// Maximum number of documents returned
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Option<Document>) -> Self {
        self.filter = filter;
        self
    }

    pub fn projection(mut self, projection: Option<Document>) -> Self {
        self.projection = projection;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Forward-only iterator over the documents of one query.
///
/// Implementations that hold server-side resources release them in
/// [`DocumentIterator::close`]; the default does nothing.
pub trait DocumentIterator: Iterator<Item = StoreResult<Document>> {
    fn close(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// Catalog listing and document queries against a backing store.
pub trait DocumentStore: Send + Sync {
    /// Names of all databases (schemas).
    fn list_database_names(&self) -> StoreResult<Vec<String>>;

    /// Names of all collections (physical tables) in a database.
    fn list_collection_names(&self, database: &str) -> StoreResult<Vec<String>>;

    /// Open a forward-only query over one collection.
    fn find(
        &self,
        database: &str,
        collection: &str,
        options: &FindOptions,
    ) -> StoreResult<Box<dyn DocumentIterator + '_>>;
}

/// Handle on one database of a store.
#[derive(Clone)]
pub struct Database<'a> {
    store: &'a dyn DocumentStore,
    name: String,
}

impl<'a> Database<'a> {
    pub fn new(store: &'a dyn DocumentStore, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn list_collection_names(&self) -> StoreResult<Vec<String>> {
        self.store.list_collection_names(&self.name)
    }

    pub fn collection(&self, name: impl Into<String>) -> Collection<'a> {
        Collection {
            store: self.store,
            database: self.name.clone(),
            name: name.into(),
        }
    }
}

/// Handle on one collection of a database.
#[derive(Clone)]
pub struct Collection<'a> {
    store: &'a dyn DocumentStore,
    database: String,
    name: String,
}

impl<'a> Collection<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn find(&self, options: &FindOptions) -> StoreResult<Box<dyn DocumentIterator + 'a>> {
        self.store.find(&self.database, &self.name, options)
    }
}

/// Top-level equality filter shared by the bundled stores.
pub(crate) fn matches_filter(document: &Document, filter: Option<&Document>) -> bool {
    filter.is_none_or(|filter| {
        filter
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    })
}

/// Inclusion projection shared by the bundled stores.
///
/// Field names match ignoring ASCII case. `_id` is kept unless the projection
/// excludes it explicitly.
pub(crate) fn apply_projection(document: Document, projection: Option<&Document>) -> Document {
    let Some(projection) = projection else {
        return document;
    };
    let included: Vec<&str> = projection
        .iter()
        .filter(|(_, flag)| is_truthy(flag))
        .map(|(field, _)| field)
        .collect();
    if included.is_empty() {
        return document;
    }
    let keep_id = projection.get("_id").is_none_or(is_truthy);
    document
        .into_iter()
        .filter(|(field, _)| {
            included.iter().any(|name| name.eq_ignore_ascii_case(field))
                || (field == "_id" && keep_id)
        })
        .collect()
}

fn is_truthy(flag: &Value) -> bool {
    match flag {
        Value::Bool(b) => *b,
        Value::Int32(i) => *i != 0,
        Value::Int64(i) => *i != 0,
        Value::Float64(f) => *f != 0.0,
        _ => true,
    }
}
