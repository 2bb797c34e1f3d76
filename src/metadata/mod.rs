//! Catalog metadata: schemas, tables, table schemas and splits
//!
//! A logical table resolves to one or more physical collections through the
//! configured [`PatternSet`]. Its schema comes from a supplemental catalog when
//! that catalog has a flagged entry, and otherwise from sampling the resolved
//! collections through a [`ChainedCursor`].

use crate::config::ConnectorConfig;
use crate::cursor::{ChainedCursor, CursorError};
use crate::glob::PatternSet;
use crate::inference::{DefaultSchemaProvider, SchemaProvider};
use crate::models::{Column, ColumnKind, SOURCE_TABLE_PROPERTY, Schema};
use crate::store::{Database, DocumentStore, FindOptions, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Catalog parameter marking an entry as authoritative for this connector.
pub const DOCDB_METADATA_FLAG: &str = "docdb-metadata-flag";

/// Split property carrying the connection string.
pub const DOCDB_CONN_STR: &str = "connStr";

/// Error type for metadata operations
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// No physical collection backs the requested table
    #[error("Table not found: {schema}.{table}")]
    TableNotFound { schema: String, table: String },

    /// Neither the catalog nor the defaults name a connection
    #[error("No connection string configured for catalog {0}")]
    MissingConnection(String),

    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cursor error
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// Supplemental catalog lookup failed
    #[error("Supplemental metadata error: {0}")]
    Supplemental(String),
}

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Table entry of an external catalog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogTable {
    pub schema: Schema,
    pub parameters: BTreeMap<String, String>,
}

impl CatalogTable {
    /// Whether the entry is flagged for use by this connector.
    pub fn is_flagged(&self) -> bool {
        self.parameters.contains_key(DOCDB_METADATA_FLAG)
    }
}

/// External catalog consulted before inference.
pub trait SupplementalMetadata: Send + Sync {
    fn get_table(&self, schema: &str, table: &str) -> MetadataResult<Option<CatalogTable>>;
}

/// Where a table schema came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSource {
    Supplemental,
    Inferred,
}

/// Resolved table: names plus schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema_name: String,
    pub table_name: String,
    pub schema: Schema,
    pub source: SchemaSource,
}

/// A unit of scan work. Every table is scanned as a single split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub id: Uuid,
    pub properties: BTreeMap<String, String>,
}

impl Split {
    pub fn new(connection_string: impl Into<String>) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(DOCDB_CONN_STR.to_string(), connection_string.into());
        Self {
            id: Uuid::new_v4(),
            properties,
        }
    }

    pub fn connection_string(&self) -> Option<&str> {
        self.properties.get(DOCDB_CONN_STR).map(String::as_str)
    }
}

/// Physical collections backing `table` in `database`.
///
/// A multi-tenant table keeps every collection its pattern accepts; any other
/// table keeps the collections whose name equals it ignoring case.
pub fn resolve_collections(
    store: &dyn DocumentStore,
    patterns: &PatternSet,
    database: &str,
    table: &str,
) -> MetadataResult<Vec<String>> {
    let names = store.list_collection_names(database)?;
    let collections: Vec<String> = if patterns.is_multi_tenant(table) {
        names
            .into_iter()
            .filter(|name| patterns.matches(table, name))
            .collect()
    } else {
        names
            .into_iter()
            .filter(|name| name.eq_ignore_ascii_case(table))
            .collect()
    };

    if collections.is_empty() {
        return Err(MetadataError::TableNotFound {
            schema: database.to_string(),
            table: table.to_string(),
        });
    }
    debug!("Resolved {}.{} to {:?}", database, table, collections);
    Ok(collections)
}

/// Answers catalog questions for one document store.
pub struct MetadataHandler {
    store: Arc<dyn DocumentStore>,
    config: ConnectorConfig,
    patterns: PatternSet,
    supplemental: Option<Box<dyn SupplementalMetadata>>,
    schema_provider: Box<dyn SchemaProvider>,
}

impl MetadataHandler {
    pub fn new(store: Arc<dyn DocumentStore>, config: ConnectorConfig) -> Self {
        let patterns = PatternSet::parse(&config.glob_pattern);
        let schema_provider = Box::new(DefaultSchemaProvider::new(config.sample_size));
        Self {
            store,
            config,
            patterns,
            supplemental: None,
            schema_provider,
        }
    }

    pub fn with_supplemental_metadata(
        mut self,
        source: impl SupplementalMetadata + 'static,
    ) -> Self {
        self.supplemental = Some(Box::new(source));
        self
    }

    pub fn with_schema_provider(mut self, provider: impl SchemaProvider + 'static) -> Self {
        self.schema_provider = Box::new(provider);
        self
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Database names.
    pub fn list_schema_names(&self) -> MetadataResult<Vec<String>> {
        Ok(self.store.list_database_names()?)
    }

    /// Logical table names of a database: collection names canonicalised
    /// through the patterns, first occurrence wins.
    pub fn list_table_names(&self, schema: &str) -> MetadataResult<Vec<String>> {
        let mut tables: Vec<String> = Vec::new();
        for collection in self.store.list_collection_names(schema)? {
            let table = self.patterns.canonicalize(&collection);
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
        Ok(tables)
    }

    /// Schema of a logical table.
    pub fn get_table(&self, schema_name: &str, table_name: &str) -> MetadataResult<TableInfo> {
        if let Some(schema) = self.supplemental_schema(schema_name, table_name) {
            return Ok(TableInfo {
                schema_name: schema_name.to_string(),
                table_name: table_name.to_string(),
                schema,
                source: SchemaSource::Supplemental,
            });
        }

        let schema = self.infer_table_schema(schema_name, table_name)?;
        Ok(TableInfo {
            schema_name: schema_name.to_string(),
            table_name: table_name.to_string(),
            schema,
            source: SchemaSource::Inferred,
        })
    }

    /// The single split of a table in `catalog`.
    pub fn get_splits(&self, catalog: &str) -> MetadataResult<Vec<Split>> {
        let connection_string = self
            .config
            .connection_string(catalog)
            .ok_or_else(|| MetadataError::MissingConnection(catalog.to_string()))?;
        Ok(vec![Split::new(connection_string)])
    }

    fn supplemental_schema(&self, schema_name: &str, table_name: &str) -> Option<Schema> {
        let source = self.supplemental.as_ref()?;
        match source.get_table(schema_name, table_name) {
            Ok(Some(table)) if table.is_flagged() => {
                info!(
                    "Using supplemental metadata for {}.{}",
                    schema_name,
                    table_name
                );
                Some(table.schema)
            }
            Ok(Some(_)) => {
                debug!(
                    "Supplemental entry for {}.{} is not flagged, inferring",
                    schema_name, table_name
                );
                None
            }
            Ok(None) => {
                debug!(
                    "No supplemental metadata for {}.{}",
                    schema_name,
                    table_name
                );
                None
            }
            Err(e) => {
                warn!(
                    "Supplemental metadata lookup failed for {}.{}, inferring: {}",
                    schema_name, table_name, e
                );
                None
            }
        }
    }

    fn infer_table_schema(&self, schema_name: &str, table_name: &str) -> MetadataResult<Schema> {
        let collections =
            resolve_collections(self.store.as_ref(), &self.patterns, schema_name, table_name)?;
        info!(
            "Inferring schema for {}.{} from {} collection(s)",
            schema_name,
            table_name,
            collections.len()
        );

        let sample_size = self.config.sample_size;
        let options = FindOptions::new()
            .limit(sample_size)
            .batch_size(sample_size);
        let database = Database::new(self.store.as_ref(), schema_name);
        let mut cursor = ChainedCursor::new(database, collections, |c| c.find(&options));

        let inferred = self.schema_provider.get_schema(&mut cursor);
        let closed = cursor.close();
        let mut schema = inferred?;
        closed?;

        if self.patterns.is_multi_tenant(table_name) {
            for placeholder in self.patterns.placeholders(table_name) {
                schema.upsert(Column::new(placeholder, ColumnKind::String));
            }
        }
        Ok(schema.with_metadata(SOURCE_TABLE_PROPERTY, table_name))
    }
}
