//! `scan` command

use super::ConnectArgs;
use crate::cli::error::CliError;
use crate::metadata::MetadataHandler;
use crate::models::{Document, Value};
use crate::records::{
    BlockSink, CancellationToken, RecordHandler, ScanRequest, ScanSummary, SinkError,
};
use std::io::{self, Write};
use std::sync::Arc;

/// Scan command arguments
#[derive(Debug, Clone)]
pub struct ScanArgs {
    pub schema: String,
    pub table: String,
    /// Stop after this many accepted rows
    pub limit: Option<usize>,
    /// Native query filter as a JSON object
    pub filter: Option<String>,
}

/// Writes each accepted row as one JSON line and cancels the scan at the limit.
///
/// A failed write also cancels the scan and is kept until the scan returns.
struct JsonLinesSink<W: Write> {
    out: W,
    current: Document,
    written: usize,
    limit: Option<usize>,
    token: CancellationToken,
    error: Option<io::Error>,
}

impl<W: Write> JsonLinesSink<W> {
    fn new(out: W, limit: Option<usize>, token: CancellationToken) -> Self {
        Self {
            out,
            current: Document::new(),
            written: 0,
            limit,
            token,
            error: None,
        }
    }

    /// Flush the output and report the first write failure, if any.
    fn finish(mut self) -> Result<(), CliError> {
        if let Some(e) = self.error.take() {
            return Err(CliError::IoError(format!("Failed to write row: {}", e)));
        }
        self.out
            .flush()
            .map_err(|e| CliError::IoError(format!("Failed to flush output: {}", e)))
    }
}

impl<W: Write> BlockSink for JsonLinesSink<W> {
    fn offer(&mut self, field: &str, _row: usize, value: Value) -> Result<bool, SinkError> {
        self.current.insert(field, value);
        Ok(true)
    }

    fn end_row(&mut self, _row: usize, accepted: bool) {
        let row = std::mem::take(&mut self.current);
        if !accepted || self.error.is_some() {
            return;
        }
        if let Err(e) = writeln!(self.out, "{}", row.to_json()) {
            tracing::error!("Failed to write row: {}", e);
            self.error = Some(e);
            self.token.cancel();
            return;
        }
        self.written += 1;
        if self.limit.is_some_and(|limit| self.written >= limit) {
            self.token.cancel();
        }
    }
}

fn parse_filter(filter: Option<&str>) -> Result<Document, CliError> {
    let Some(filter) = filter else {
        return Ok(Document::new());
    };
    let json: serde_json::Value =
        serde_json::from_str(filter).map_err(|e| CliError::InvalidFilter(e.to_string()))?;
    Document::try_from(json).map_err(CliError::InvalidFilter)
}

/// Run `request` and write its rows to `out`.
fn write_scan<W: Write>(
    handler: &RecordHandler,
    request: &ScanRequest,
    out: W,
    limit: Option<usize>,
) -> Result<ScanSummary, CliError> {
    let token = CancellationToken::new();
    let mut sink = JsonLinesSink::new(out, limit, token.clone());
    let summary = handler.read_with_constraint(request, &mut sink, &token)?;
    sink.finish()?;
    Ok(summary)
}

/// Scan a logical table and print its rows as JSON lines.
pub fn handle_scan(args: &ConnectArgs, scan: &ScanArgs) -> Result<(), CliError> {
    if scan.limit == Some(0) {
        return Err(CliError::InvalidArgument(
            "--limit must be positive".to_string(),
        ));
    }
    let query = parse_filter(scan.filter.as_deref())?;

    let config = args.load_config()?;
    let store = args.connect(&config)?;
    let table = MetadataHandler::new(Arc::clone(&store), config.clone())
        .get_table(&scan.schema, &scan.table)?;

    let request = ScanRequest::new(&scan.schema, &scan.table, table.schema).with_query(query);
    let handler = RecordHandler::new(store, config);
    let summary = write_scan(&handler, &request, io::stdout().lock(), scan.limit)?;
    eprintln!(
        "{} document(s) read, {} row(s) written",
        summary.num_rows, summary.num_result_rows
    );
    Ok(())
}
