//! Newline-delimited JSON document store
//!
//! Layout on disk:
//!
//! ```text
//! <root>/
//!   <database>/
//!     <collection>.jsonl   one JSON document per line
//! ```
//!
//! Lines are decoded lazily while the cursor is read. Extended JSON wrappers
//! (`{"$oid": ...}`, `{"$date": ...}`, `{"$timestamp": ...}`) map to the
//! matching store-native values.

use super::{
    DocumentIterator, DocumentStore, FindOptions, StoreError, StoreResult, apply_projection,
    matches_filter,
};
use crate::models::Document;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension of collection files.
pub const COLLECTION_EXTENSION: &str = "jsonl";

/// Document store backed by a directory tree of `.jsonl` files.
#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    root: PathBuf,
}

impl JsonLinesStore {
    /// Open a store rooted at `root`. The directory must exist.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::ConnectionFailed(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Open a store from a connection string: a plain path or a `file://` URL.
    pub fn from_connection_string(connection_string: &str) -> StoreResult<Self> {
        let path = connection_string
            .strip_prefix("file://")
            .unwrap_or(connection_string);
        Self::open(path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn database_dir(&self, database: &str) -> StoreResult<PathBuf> {
        let dir = self.root.join(database);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(StoreError::DatabaseNotFound(database.to_string()))
        }
    }
}

fn sorted_entries(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)
        .map_err(|e| StoreError::IoError(format!("Failed to read {}: {}", dir.display(), e)))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::IoError(format!("Failed to read {}: {}", dir.display(), e)))?;
    entries.sort();
    Ok(entries)
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()?.to_str().map(str::to_string)
}

impl DocumentStore for JsonLinesStore {
    fn list_database_names(&self) -> StoreResult<Vec<String>> {
        Ok(sorted_entries(&self.root)?
            .into_iter()
            .filter(|p| p.is_dir())
            .filter_map(|p| p.file_name().and_then(|s| s.to_str()).map(str::to_string))
            .collect())
    }

    fn list_collection_names(&self, database: &str) -> StoreResult<Vec<String>> {
        Ok(sorted_entries(&self.database_dir(database)?)?
            .into_iter()
            .filter(|p| p.is_file())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(COLLECTION_EXTENSION))
            .filter_map(|p| file_stem(&p))
            .collect())
    }

    fn find(
        &self,
        database: &str,
        collection: &str,
        options: &FindOptions,
    ) -> StoreResult<Box<dyn DocumentIterator + '_>> {
        let path = self
            .database_dir(database)?
            .join(format!("{}.{}", collection, COLLECTION_EXTENSION));
        if !path.is_file() {
            return Err(StoreError::CollectionNotFound {
                database: database.to_string(),
                collection: collection.to_string(),
            });
        }
        let file = File::open(&path)
            .map_err(|e| StoreError::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
        debug!("Opened collection file {}", path.display());

        Ok(Box::new(JsonLinesCursor {
            path,
            lines: Some(BufReader::new(file).lines()),
            line_no: 0,
            returned: 0,
            options: options.clone(),
        }))
    }
}

struct JsonLinesCursor {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    line_no: usize,
    returned: usize,
    options: FindOptions,
}

impl JsonLinesCursor {
    fn decode(&self, line: &str) -> StoreResult<Document> {
        let json: serde_json::Value = serde_json::from_str(line).map_err(|e| {
            StoreError::ParseError(format!("{}:{}: {}", self.path.display(), self.line_no, e))
        })?;
        Document::try_from(json).map_err(|e| {
            StoreError::ParseError(format!("{}:{}: {}", self.path.display(), self.line_no, e))
        })
    }
}

impl Iterator for JsonLinesCursor {
    type Item = StoreResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.options.limit.is_some_and(|max| self.returned >= max) {
            return None;
        }
        loop {
            let line = match self.lines.as_mut()?.next()? {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(StoreError::IoError(format!(
                        "Failed to read {}: {}",
                        self.path.display(),
                        e
                    ))));
                }
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let document = match self.decode(&line) {
                Ok(document) => document,
                Err(e) => return Some(Err(e)),
            };
            if !matches_filter(&document, self.options.filter.as_ref()) {
                continue;
            }
            self.returned += 1;
            return Some(Ok(apply_projection(
                document,
                self.options.projection.as_ref(),
            )));
        }
    }
}

impl DocumentIterator for JsonLinesCursor {
    fn close(&mut self) -> StoreResult<()> {
        self.lines = None;
        Ok(())
    }
}
