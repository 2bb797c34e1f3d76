//! Scan execution: reading coerced rows of a logical table into a sink
//!
//! A scan resolves the physical collections of a table the same way schema
//! resolution does, chains them behind one cursor, and for every document
//! coerces each schema column and offers it to a [`BlockSink`]. The scan polls
//! a [`QueryStatus`] once per document and stops as soon as it reports that
//! the query is no longer live. The cursor is closed on every exit path.

pub mod sink;

pub use sink::{BlockSink, SinkError, VecSink};

use crate::coercion::coerce;
use crate::config::ConnectorConfig;
use crate::cursor::{ChainedCursor, CursorError};
use crate::glob::PatternSet;
use crate::metadata::{MetadataError, resolve_collections};
use crate::models::{Document, Schema, Value};
use crate::store::{
    Collection, Database, DocumentIterator, DocumentStore, FindOptions, StoreError, StoreResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Error type for scan operations
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Coercing or offering one field failed
    #[error("Error while processing field {field}: {source}")]
    Field {
        field: String,
        #[source]
        source: SinkError,
    },

    /// Cursor error
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Table resolution failed
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Result type for scan operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Liveness of the query a scan is serving.
pub trait QueryStatus {
    fn is_live(&self) -> bool;
}

impl<F> QueryStatus for F
where
    F: Fn() -> bool,
{
    fn is_live(&self) -> bool {
        self()
    }
}

/// Cancellation flag shared between a scan and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl QueryStatus for CancellationToken {
    fn is_live(&self) -> bool {
        !self.is_cancelled()
    }
}

/// What to scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub schema_name: String,
    pub table_name: String,
    pub schema: Schema,
    /// Native query filter produced by predicate pushdown; empty reads everything
    pub query: Document,
}

impl ScanRequest {
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        schema: Schema,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            schema,
            query: Document::new(),
        }
    }

    pub fn with_query(mut self, query: Document) -> Self {
        self.query = query;
        self
    }
}

/// Counters reported at the end of a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Documents read from the store
    pub num_rows: usize,
    /// Rows the sink accepted
    pub num_result_rows: usize,
}

/// Inclusion projection over every column of `schema`.
pub fn make_projection(schema: &Schema) -> Document {
    schema
        .names()
        .map(|name| (name, Value::Int32(1)))
        .collect()
}

/// Reads table rows from one document store.
pub struct RecordHandler {
    store: Arc<dyn DocumentStore>,
    config: ConnectorConfig,
    patterns: PatternSet,
}

impl RecordHandler {
    pub fn new(store: Arc<dyn DocumentStore>, config: ConnectorConfig) -> Self {
        let patterns = PatternSet::parse(&config.glob_pattern);
        Self {
            store,
            config,
            patterns,
        }
    }

    /// Scan `request` into `sink` while `status` reports the query live.
    pub fn read_with_constraint(
        &self,
        request: &ScanRequest,
        sink: &mut dyn BlockSink,
        status: &dyn QueryStatus,
    ) -> RecordResult<ScanSummary> {
        let table = request
            .schema
            .source_table()
            .unwrap_or(&request.table_name);
        let collections = resolve_collections(
            self.store.as_ref(),
            &self.patterns,
            &request.schema_name,
            table,
        )?;

        let projection = if self.config.disable_projection_and_casing {
            None
        } else {
            Some(make_projection(&request.schema))
        };
        info!(
            "Scanning {}.{} with query {} and projection {}",
            request.schema_name,
            table,
            request.query.to_json(),
            projection
                .as_ref()
                .map_or_else(|| "none".to_string(), |p| p.to_json().to_string())
        );

        let filter = (!request.query.is_empty()).then(|| request.query.clone());
        let options = FindOptions::new()
            .filter(filter)
            .projection(projection)
            .batch_size(self.config.batch_size);
        let database = Database::new(self.store.as_ref(), request.schema_name.as_str());
        let mut cursor = ChainedCursor::new(database, collections, |c| c.find(&options));

        let scanned = self.write_rows(&mut cursor, table, request, sink, status);
        let closed = cursor.close();
        let summary = scanned?;
        closed?;

        info!(
            "Scan finished: num_rows={} num_result_rows={}",
            summary.num_rows, summary.num_result_rows
        );
        Ok(summary)
    }

    fn write_rows<'a, F>(
        &self,
        cursor: &mut ChainedCursor<'a, F>,
        table: &str,
        request: &ScanRequest,
        sink: &mut dyn BlockSink,
        status: &dyn QueryStatus,
    ) -> RecordResult<ScanSummary>
    where
        F: FnMut(&Collection<'a>) -> StoreResult<Box<dyn DocumentIterator + 'a>>,
    {
        let mut summary = ScanSummary::default();
        let case_insensitive = !self.config.disable_projection_and_casing;
        let multi_tenant = self.patterns.is_multi_tenant(table);

        while status.is_live() && cursor.has_next()? {
            let captures: BTreeMap<String, String> = match cursor.current_collection() {
                Some(collection) if multi_tenant => self.patterns.capture_groups(collection),
                _ => BTreeMap::new(),
            };
            let document = cursor.next_document()?;
            summary.num_rows += 1;

            let row = summary.num_result_rows;
            let mut accepted = true;
            for column in &request.schema.columns {
                let raw = match captured(&captures, &column.name, case_insensitive) {
                    Some(captured) => Value::String(captured.clone()),
                    None => {
                        let field = if case_insensitive {
                            document.get_ignore_case(&column.name)
                        } else {
                            document.get(&column.name)
                        };
                        field.cloned().unwrap_or(Value::Null)
                    }
                };
                let value = coerce(&column.kind, raw);

                let offered = if column.kind.is_complex() {
                    sink.offer_complex(&column.name, row, value)
                } else {
                    sink.offer(&column.name, row, value)
                };
                let matched = offered.map_err(|source| RecordError::Field {
                    field: column.name.clone(),
                    source,
                })?;
                if !matched {
                    accepted = false;
                    break;
                }
            }

            sink.end_row(row, accepted);
            if accepted {
                summary.num_result_rows += 1;
            } else {
                debug!("Row {} rejected by the sink", summary.num_rows);
            }
        }
        Ok(summary)
    }
}

fn captured<'c>(
    captures: &'c BTreeMap<String, String>,
    column: &str,
    case_insensitive: bool,
) -> Option<&'c String> {
    if case_insensitive {
        captures
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    } else {
        captures.get(column)
    }
}
