//! Chained cursor over a sequence of collections
//!
//! Presents an ordered list of physical collections as one pull-based stream
//! of documents. Collection `k` is opened only after collection `k - 1` is
//! exhausted, and the previous underlying cursor is closed before the next one
//! is opened, so at most one store cursor is live at any time.
//!
//! The cursor is a small state machine:
//!
//! ```text
//! NotStarted --open(0)--> OnCollection(0) --exhausted--> OnCollection(1) ... --> Exhausted
//!      \______________________ no collections / close() ____________________/
//! ```

use crate::models::Document;
use crate::store::{Collection, Database, DocumentIterator, StoreError, StoreResult};
use tracing::{debug, info, warn};

/// Error type for chained cursor operations
#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    /// Opening the query on a collection failed
    #[error("Failed to open collection {collection}: {source}")]
    Open {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// Reading the next document failed
    #[error("Failed to read from collection {collection}: {source}")]
    Read {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// Releasing the underlying cursor failed
    #[error("Unable to close the cursor on collection {collection}: {source}")]
    Close {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// `next_document` was called on an exhausted cursor
    #[error("No more documents")]
    Exhausted,
}

/// Result type for cursor operations
pub type CursorResult<T> = Result<T, CursorError>;

enum CursorState<'a> {
    NotStarted,
    OnCollection {
        index: usize,
        rows: Box<dyn DocumentIterator + 'a>,
        peeked: Option<Document>,
    },
    Exhausted,
}

/// Lazily chained cursor over several collections of one database.
///
/// Must not be shared between threads while iterating; callers that stop early
/// call [`ChainedCursor::close`] (dropping the cursor also closes it, but can
/// only log a close failure).
pub struct ChainedCursor<'a, F>
where
    F: FnMut(&Collection<'a>) -> StoreResult<Box<dyn DocumentIterator + 'a>>,
{
    database: Database<'a>,
    collections: Vec<String>,
    query: F,
    state: CursorState<'a>,
}

impl<'a, F> ChainedCursor<'a, F>
where
    F: FnMut(&Collection<'a>) -> StoreResult<Box<dyn DocumentIterator + 'a>>,
{
    /// Chain `collections` of `database`, opening each with `query`.
    pub fn new(database: Database<'a>, collections: Vec<String>, query: F) -> Self {
        info!("Initialized chained cursor for {}", database.name());
        Self {
            database,
            collections,
            query,
            state: CursorState::NotStarted,
        }
    }

    /// Name of the collection currently being read.
    pub fn current_collection(&self) -> Option<&str> {
        match &self.state {
            CursorState::OnCollection { index, .. } => {
                self.collections.get(*index).map(String::as_str)
            }
            _ => None,
        }
    }

    /// Whether another document is available, advancing across exhausted
    /// collections as needed.
    pub fn has_next(&mut self) -> CursorResult<bool> {
        loop {
            let next_index = match &mut self.state {
                CursorState::Exhausted => return Ok(false),
                CursorState::NotStarted => 0,
                CursorState::OnCollection {
                    index,
                    rows,
                    peeked,
                } => {
                    if peeked.is_some() {
                        return Ok(true);
                    }
                    match rows.next() {
                        Some(Ok(document)) => {
                            *peeked = Some(document);
                            return Ok(true);
                        }
                        Some(Err(source)) => {
                            return Err(CursorError::Read {
                                collection: self.collections[*index].clone(),
                                source,
                            });
                        }
                        None => *index + 1,
                    }
                }
            };
            self.advance(next_index)?;
        }
    }

    /// The next document.
    pub fn next_document(&mut self) -> CursorResult<Document> {
        if !self.has_next()? {
            return Err(CursorError::Exhausted);
        }
        match &mut self.state {
            CursorState::OnCollection { peeked, .. } => peeked.take().ok_or(CursorError::Exhausted),
            _ => Err(CursorError::Exhausted),
        }
    }

    /// Release the open underlying cursor, if any. Idempotent.
    ///
    /// A closed chained cursor yields no further documents.
    pub fn close(&mut self) -> CursorResult<()> {
        self.release()?;
        self.state = CursorState::Exhausted;
        Ok(())
    }

    /// Close the current collection and move to `index`.
    fn advance(&mut self, index: usize) -> CursorResult<()> {
        self.release()?;
        let Some(name) = self.collections.get(index) else {
            info!("No more collections to chain");
            self.state = CursorState::Exhausted;
            return Ok(());
        };

        info!("Iterating over collection {}", name);
        let collection = self.database.collection(name.as_str());
        let rows = (self.query)(&collection).map_err(|source| CursorError::Open {
            collection: name.clone(),
            source,
        })?;
        self.state = CursorState::OnCollection {
            index,
            rows,
            peeked: None,
        };
        Ok(())
    }

    /// Close the live underlying cursor and leave the slot empty.
    fn release(&mut self) -> CursorResult<()> {
        let previous = std::mem::replace(&mut self.state, CursorState::Exhausted);
        if let CursorState::OnCollection {
            index, mut rows, ..
        } = previous
        {
            debug!("Closing cursor on collection {}", self.collections[index]);
            rows.close().map_err(|source| CursorError::Close {
                collection: self.collections[index].clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl<'a, F> Iterator for ChainedCursor<'a, F>
where
    F: FnMut(&Collection<'a>) -> StoreResult<Box<dyn DocumentIterator + 'a>>,
{
    type Item = CursorResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_document()),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<'a, F> Drop for ChainedCursor<'a, F>
where
    F: FnMut(&Collection<'a>) -> StoreResult<Box<dyn DocumentIterator + 'a>>,
{
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{}", e);
        }
    }
}
