//! Hierarchical document store — the sole source of truth and the sole
//! point of serialization between requests.
//!
//! Paths alternate collection and document segments, Firestore-style:
//! `users/{subject}/clinical/{type}/records/{ts}`. The core consumes the
//! store as-is through the `DocumentStore` trait; `SqliteStore` is the
//! bundled implementation, and tests run it in memory.

pub mod layout;
pub mod sqlite;

pub use sqlite::SqliteStore;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// A path into the hierarchy. Even segment counts address documents,
/// odd counts address collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    segments: Vec<String>,
}

impl DocPath {
    /// Top-level collection.
    pub fn collection(name: &str) -> Self {
        Self {
            segments: vec![name.to_string()],
        }
    }

    /// Append a document segment. Valid only on a collection path.
    pub fn doc(&self, id: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Self { segments }
    }

    /// Append a subcollection segment. Valid only on a document path.
    pub fn sub(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    pub fn is_document(&self) -> bool {
        self.segments.len() % 2 == 0
    }

    /// Last segment — the document id for document paths.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Slash-joined key. Segments never contain '/' in this system
    /// (ids are digits, uuids, emails, or timestamp strings).
    pub fn key(&self) -> String {
        self.segments.join("/")
    }

    /// Key of the enclosing collection (for a document path).
    pub fn parent_key(&self) -> String {
        self.segments[..self.segments.len().saturating_sub(1)].join("/")
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// A stored document: its id within the collection plus the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: Value,
}

/// One write operation inside a batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put { path: DocPath, body: Value },
    Delete { path: DocPath },
}

/// An ordered group of writes. `SqliteStore` applies a batch inside one
/// transaction; the approval transition relies on this to never leave a
/// record written without its audit entry and queue deletion.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(mut self, path: DocPath, body: Value) -> Self {
        self.ops.push(WriteOp::Put { path, body });
        self
    }

    pub fn delete(mut self, path: DocPath) -> Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }
}

/// The persistence seam. All methods take document/collection paths as
/// built by `DocPath`; none of them retries — transient store failures
/// propagate typed to the boundary.
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document, `None` if absent.
    fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Create or replace a document.
    fn put(&self, path: &DocPath, body: &Value) -> Result<(), StoreError>;

    /// Delete a document. Returns whether it existed.
    fn delete(&self, path: &DocPath) -> Result<bool, StoreError>;

    /// All documents directly under a collection, ordered by id.
    fn list(&self, collection: &DocPath) -> Result<Vec<Document>, StoreError>;

    /// Names of subcollections under a document, ordered.
    fn list_subcollections(&self, doc: &DocPath) -> Result<Vec<String>, StoreError>;

    /// Documents in a collection whose `field` equals `value`.
    /// Lookup by attribute, not by document key.
    fn find_by_field(
        &self,
        collection: &DocPath,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .list(collection)?
            .into_iter()
            .filter(|doc| doc.body.get(field) == Some(value))
            .collect())
    }

    /// Apply a batch of writes. Implementations that can, apply it
    /// atomically; the default falls back to sequential application.
    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        for op in batch.ops {
            match op {
                WriteOp::Put { path, body } => self.put(&path, &body)?,
                WriteOp::Delete { path } => {
                    self.delete(&path)?;
                }
            }
        }
        Ok(())
    }
}
