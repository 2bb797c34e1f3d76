//! In-memory document store
//!
//! Databases and collections keep their insertion order, which makes listing
//! and cursor chaining deterministic in tests.

use super::{
    DocumentIterator, DocumentStore, FindOptions, StoreError, StoreResult, apply_projection,
    matches_filter,
};
use crate::models::Document;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts of cursors opened and closed against a [`MemoryStore`].
#[derive(Debug, Default)]
pub struct CursorStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl CursorStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Cursors opened but not yet closed.
    pub fn open(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

#[derive(Debug, Default)]
struct MemoryDatabase {
    name: String,
    collections: Vec<(String, Vec<Document>)>,
}

/// Ordered in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    databases: Vec<MemoryDatabase>,
    failing_close: HashSet<String>,
    stats: Arc<CursorStats>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents to a collection, creating the database and collection as needed.
    pub fn insert_many(
        &mut self,
        database: &str,
        collection: &str,
        documents: impl IntoIterator<Item = Document>,
    ) {
        let db = match self.databases.iter().position(|d| d.name == database) {
            Some(idx) => &mut self.databases[idx],
            None => {
                self.databases.push(MemoryDatabase {
                    name: database.to_string(),
                    collections: Vec::new(),
                });
                let last = self.databases.len() - 1;
                &mut self.databases[last]
            }
        };
        match db.collections.iter_mut().find(|(n, _)| n == collection) {
            Some((_, docs)) => docs.extend(documents),
            None => db
                .collections
                .push((collection.to_string(), documents.into_iter().collect())),
        }
    }

    /// Builder-style [`MemoryStore::insert_many`].
    pub fn with_collection(
        mut self,
        database: &str,
        collection: &str,
        documents: impl IntoIterator<Item = Document>,
    ) -> Self {
        self.insert_many(database, collection, documents);
        self
    }

    /// Make every cursor over `collection` fail when closed.
    pub fn fail_close_on(mut self, collection: &str) -> Self {
        self.failing_close.insert(collection.to_string());
        self
    }

    pub fn stats(&self) -> Arc<CursorStats> {
        Arc::clone(&self.stats)
    }

    fn database(&self, name: &str) -> StoreResult<&MemoryDatabase> {
        self.databases
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| StoreError::DatabaseNotFound(name.to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn list_database_names(&self) -> StoreResult<Vec<String>> {
        Ok(self.databases.iter().map(|d| d.name.clone()).collect())
    }

    fn list_collection_names(&self, database: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .database(database)?
            .collections
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn find(
        &self,
        database: &str,
        collection: &str,
        options: &FindOptions,
    ) -> StoreResult<Box<dyn DocumentIterator + '_>> {
        let documents = self
            .database(database)?
            .collections
            .iter()
            .find(|(name, _)| name == collection)
            .map(|(_, docs)| docs)
            .ok_or_else(|| StoreError::CollectionNotFound {
                database: database.to_string(),
                collection: collection.to_string(),
            })?;

        let selected: Vec<Document> = documents
            .iter()
            .filter(|doc| matches_filter(doc, options.filter.as_ref()))
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|doc| apply_projection(doc.clone(), options.projection.as_ref()))
            .collect();

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            collection: collection.to_string(),
            documents: selected.into_iter(),
            stats: Arc::clone(&self.stats),
            fail_close: self.failing_close.contains(collection),
            closed: false,
        }))
    }
}

struct MemoryCursor {
    collection: String,
    documents: std::vec::IntoIter<Document>,
    stats: Arc<CursorStats>,
    fail_close: bool,
    closed: bool,
}

impl Iterator for MemoryCursor {
    type Item = StoreResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.documents.next().map(Ok)
    }
}

impl DocumentIterator for MemoryCursor {
    fn close(&mut self) -> StoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(StoreError::CloseFailed(format!(
                "cursor on {} could not be released",
                self.collection
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: i32) -> Vec<Document> {
        (0..n).map(|i| Document::new().with("n", i)).collect()
    }

    #[test]
    fn test_listing_keeps_insertion_order() {
        let store = MemoryStore::new()
            .with_collection("db2", "z", numbered(1))
            .with_collection("db1", "b", numbered(1))
            .with_collection("db1", "a", numbered(1));
        assert_eq!(store.list_database_names().unwrap(), vec!["db2", "db1"]);
        assert_eq!(store.list_collection_names("db1").unwrap(), vec!["b", "a"]);
        assert!(matches!(
            store.list_collection_names("missing"),
            Err(StoreError::DatabaseNotFound(_))
        ));
    }

    #[test]
    fn test_find_honours_limit_and_counts_cursors() {
        let store = MemoryStore::new().with_collection("db", "c", numbered(5));
        let stats = store.stats();

        let mut cursor = store
            .find("db", "c", &FindOptions::new().limit(3))
            .unwrap();
        let docs: Vec<Document> = cursor.by_ref().map(Result::unwrap).collect();
        assert_eq!(docs.len(), 3);
        assert_eq!(stats.open(), 1);

        cursor.close().unwrap();
        cursor.close().unwrap();
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.closed(), 1);
    }

    #[test]
    fn test_find_missing_collection() {
        let store = MemoryStore::new().with_collection("db", "c", numbered(1));
        assert!(matches!(
            store.find("db", "other", &FindOptions::new()),
            Err(StoreError::CollectionNotFound { .. })
        ));
    }

    #[test]
    fn test_failing_close() {
        let store = MemoryStore::new()
            .with_collection("db", "c", numbered(1))
            .fail_close_on("c");
        let mut cursor = store.find("db", "c", &FindOptions::new()).unwrap();
        assert!(matches!(cursor.close(), Err(StoreError::CloseFailed(_))));
    }
}
