//! SQLite-backed document store.
//!
//! One table holds every document: the full path is the primary key, the
//! enclosing collection key is indexed for child listings. Bodies are
//! stored as JSON text. A `Mutex<Connection>` serializes access; batches
//! run inside a single transaction.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{DocPath, Document, DocumentStore, StoreError, WriteBatch, WriteOp};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    path    TEXT PRIMARY KEY,
    parent  TEXT NOT NULL,
    doc_id  TEXT NOT NULL,
    body    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_parent ON documents(parent);
";

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests and throwaway tooling.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn require_document(path: &DocPath) -> Result<(), StoreError> {
        if !path.is_document() {
            return Err(StoreError::InvalidPath(format!(
                "expected document path, got collection: {path}"
            )));
        }
        Ok(())
    }

    fn require_collection(path: &DocPath) -> Result<(), StoreError> {
        if path.is_document() {
            return Err(StoreError::InvalidPath(format!(
                "expected collection path, got document: {path}"
            )));
        }
        Ok(())
    }

    fn put_tx(conn: &Connection, path: &DocPath, body: &Value) -> Result<(), StoreError> {
        Self::require_document(path)?;
        conn.execute(
            "INSERT INTO documents (path, parent, doc_id, body) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(path) DO UPDATE SET body = excluded.body",
            params![path.key(), path.parent_key(), path.leaf(), body.to_string()],
        )?;
        Ok(())
    }

    fn delete_tx(conn: &Connection, path: &DocPath) -> Result<bool, StoreError> {
        Self::require_document(path)?;
        let affected = conn.execute("DELETE FROM documents WHERE path = ?1", params![path.key()])?;
        Ok(affected > 0)
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        Self::require_document(path)?;
        let conn = self.lock()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT doc_id, body FROM documents WHERE path = ?1",
                params![path.key()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((id, body)) => Ok(Some(Document {
                id,
                body: serde_json::from_str(&body)?,
            })),
            None => Ok(None),
        }
    }

    fn put(&self, path: &DocPath, body: &Value) -> Result<(), StoreError> {
        let conn = self.lock()?;
        Self::put_tx(&conn, path, body)
    }

    fn delete(&self, path: &DocPath) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        Self::delete_tx(&conn, path)
    }

    fn list(&self, collection: &DocPath) -> Result<Vec<Document>, StoreError> {
        Self::require_collection(collection)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT doc_id, body FROM documents WHERE parent = ?1 ORDER BY doc_id",
        )?;
        let rows = stmt.query_map(params![collection.key()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, body) = row?;
            docs.push(Document {
                id,
                body: serde_json::from_str(&body)?,
            });
        }
        Ok(docs)
    }

    fn list_subcollections(&self, doc: &DocPath) -> Result<Vec<String>, StoreError> {
        Self::require_document(doc)?;
        let prefix = format!("{}/", doc.key());
        let conn = self.lock()?;
        // Children live at {doc}/{subcollection}/{id}...; the segment
        // right after the prefix names the subcollection. substr instead
        // of LIKE: ids may contain LIKE wildcards (emails with '_').
        let mut stmt = conn.prepare(
            "SELECT DISTINCT parent FROM documents WHERE substr(parent, 1, length(?1)) = ?1",
        )?;
        let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;

        let mut names: Vec<String> = Vec::new();
        for row in rows {
            let parent = row?;
            let rest = &parent[prefix.len()..];
            let name = rest.split('/').next().unwrap_or(rest);
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for op in &batch.ops {
            match op {
                WriteOp::Put { path, body } => Self::put_tx(&tx, path, body)?,
                WriteOp::Delete { path } => {
                    Self::delete_tx(&tx, path)?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    #[test]
    fn put_get_round_trip() {
        let store = store();
        let path = DocPath::collection("users").doc("123");
        store.put(&path, &json!({"full_name": "Ahmed", "region": "cairo"})).unwrap();

        let doc = store.get(&path).unwrap().unwrap();
        assert_eq!(doc.id, "123");
        assert_eq!(doc.body["region"], "cairo");
    }

    #[test]
    fn get_missing_is_none() {
        let store = store();
        let path = DocPath::collection("users").doc("nope");
        assert!(store.get(&path).unwrap().is_none());
    }

    #[test]
    fn put_replaces_existing_body() {
        let store = store();
        let path = DocPath::collection("users").doc("123");
        store.put(&path, &json!({"v": 1})).unwrap();
        store.put(&path, &json!({"v": 2})).unwrap();
        assert_eq!(store.get(&path).unwrap().unwrap().body["v"], 2);
    }

    #[test]
    fn delete_reports_existence() {
        let store = store();
        let path = DocPath::collection("users").doc("123");
        store.put(&path, &json!({})).unwrap();
        assert!(store.delete(&path).unwrap());
        assert!(!store.delete(&path).unwrap());
    }

    #[test]
    fn list_returns_only_direct_children() {
        let store = store();
        let records = DocPath::collection("users")
            .doc("123")
            .sub("clinical")
            .doc("bloodbiomarkers")
            .sub("records");
        store.put(&records.doc("2026-03-01 09:00:00"), &json!({"n": 1})).unwrap();
        store.put(&records.doc("2026-03-02 10:00:00"), &json!({"n": 2})).unwrap();
        // Sibling collection must not leak into the listing.
        let other = DocPath::collection("users")
            .doc("123")
            .sub("clinical")
            .doc("radiology")
            .sub("records");
        store.put(&other.doc("2026-03-03 11:00:00"), &json!({"n": 3})).unwrap();

        let docs = store.list(&records).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "2026-03-01 09:00:00");
    }

    #[test]
    fn find_by_field_matches_attribute_not_key() {
        let store = store();
        let facilities = DocPath::collection("facilities");
        store
            .put(&facilities.doc("doc-a"), &json!({"facility_id": "FAC-1", "region": "cairo"}))
            .unwrap();
        store
            .put(&facilities.doc("doc-b"), &json!({"facility_id": "FAC-2", "region": "giza"}))
            .unwrap();

        let hits = store
            .find_by_field(&facilities, "facility_id", &json!("FAC-2"))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "doc-b");
    }

    #[test]
    fn list_subcollections_names_each_once() {
        let store = store();
        let reviewer = DocPath::collection("pending_approvals").doc("dr@clinic.eg");
        store
            .put(&reviewer.sub("bloodbiomarkers").doc("a"), &json!({}))
            .unwrap();
        store
            .put(&reviewer.sub("bloodbiomarkers").doc("b"), &json!({}))
            .unwrap();
        store.put(&reviewer.sub("radiology").doc("c"), &json!({})).unwrap();

        let subs = store.list_subcollections(&reviewer).unwrap();
        assert_eq!(subs, vec!["bloodbiomarkers", "radiology"]);
    }

    #[test]
    fn batch_applies_atomically() {
        let store = store();
        let pending = DocPath::collection("pending_approvals")
            .doc("admin")
            .sub("radiology")
            .doc("abc");
        store.put(&pending, &json!({"subject_id": "123"})).unwrap();

        let record = DocPath::collection("users")
            .doc("123")
            .sub("clinical")
            .doc("radiology")
            .sub("records")
            .doc("2026-03-01 09:00:00");
        let batch = WriteBatch::new()
            .put(record.clone(), json!({"ok": true}))
            .delete(pending.clone());
        store.apply(batch).unwrap();

        assert!(store.get(&record).unwrap().is_some());
        assert!(store.get(&pending).unwrap().is_none());
    }

    #[test]
    fn batch_rejects_collection_path_and_writes_nothing() {
        let store = store();
        let good = DocPath::collection("users").doc("123");
        let bad = DocPath::collection("users"); // collection, not document
        let batch = WriteBatch::new()
            .put(good.clone(), json!({}))
            .put(bad, json!({}));

        assert!(store.apply(batch).is_err());
        // First op must have rolled back with the failed batch.
        assert!(store.get(&good).unwrap().is_none());
    }

    #[test]
    fn open_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("store.db");
        let path = DocPath::collection("users").doc("123");
        {
            let store = SqliteStore::open(&db).unwrap();
            store.put(&path, &json!({"full_name": "Ahmed"})).unwrap();
        }
        let reopened = SqliteStore::open(&db).unwrap();
        assert_eq!(reopened.get(&path).unwrap().unwrap().body["full_name"], "Ahmed");
    }
}
