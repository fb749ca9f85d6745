//! Document Collections
//! Mission: Minimal capability boundary over the document store
//!
//! A [`Collection`] is the only thing the persistence layer knows about the
//! underlying store: predicate-based find, skip/limit paging, count, insert
//! and replace-by-id. Predicates are opaque Rust closures evaluated against
//! the decoded document, so the store needs no query compiler.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::entity::Entity;
use super::error::StoreError;

/// Opaque boolean predicate over a document.
pub type Filter<'a, T> = &'a (dyn Fn(&T) -> bool + Send + Sync);

/// Capability boundary to the document store, one collection per entity kind.
#[async_trait]
pub trait Collection<T: Entity>: Send + Sync {
    /// First document matching `filter`, in store order.
    async fn find_one(&self, filter: Filter<'_, T>) -> Result<Option<T>, StoreError>;

    /// All documents matching `filter`, in store order, with optional
    /// skip/limit applied after filtering.
    async fn find_many(
        &self,
        filter: Filter<'_, T>,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<T>, StoreError>;

    /// Number of documents matching `filter`.
    async fn count(&self, filter: Filter<'_, T>) -> Result<u64, StoreError>;

    /// Insert a new document. Ids are caller-assigned and unique.
    async fn insert_one(&self, doc: &T) -> Result<(), StoreError>;

    /// Full-document replace by id. Returns false when no document has `id`.
    async fn replace_one(&self, id: Uuid, doc: &T) -> Result<bool, StoreError>;
}

const SCHEMA_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
"#;

/// SQLite-backed collection storing one JSON document per row.
///
/// Store order is insertion order (rowid). The connection is shared across
/// collections and guarded by a mutex; every operation holds it only for the
/// duration of one statement.
pub struct SqliteCollection<T: Entity> {
    conn: Arc<Mutex<Connection>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> SqliteCollection<T> {
    /// Open the collection, creating its table if needed.
    pub fn open(conn: Arc<Mutex<Connection>>) -> Result<Self, StoreError> {
        {
            let guard = conn.lock();
            guard.execute_batch(SCHEMA_PRAGMAS)?;
            guard.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        id TEXT PRIMARY KEY,
                        doc TEXT NOT NULL
                    )",
                    T::COLLECTION
                ),
                [],
            )?;
        }
        Ok(Self {
            conn,
            _marker: PhantomData,
        })
    }

    /// Scan the table in rowid order, decoding and filtering each document.
    fn scan(
        &self,
        filter: Filter<'_, T>,
        skip: u64,
        limit: Option<u64>,
    ) -> Result<Vec<T>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT doc FROM {} ORDER BY rowid",
            T::COLLECTION
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        let mut matched: u64 = 0;
        for raw in rows {
            let doc: T = serde_json::from_str(&raw?)?;
            if !filter(&doc) {
                continue;
            }
            matched += 1;
            if matched <= skip {
                continue;
            }
            out.push(doc);
            if let Some(limit) = limit {
                if out.len() as u64 >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl<T: Entity> Collection<T> for SqliteCollection<T> {
    async fn find_one(&self, filter: Filter<'_, T>) -> Result<Option<T>, StoreError> {
        Ok(self.scan(filter, 0, Some(1))?.into_iter().next())
    }

    async fn find_many(
        &self,
        filter: Filter<'_, T>,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<T>, StoreError> {
        self.scan(filter, skip.unwrap_or(0), limit)
    }

    async fn count(&self, filter: Filter<'_, T>) -> Result<u64, StoreError> {
        Ok(self.scan(filter, 0, None)?.len() as u64)
    }

    async fn insert_one(&self, doc: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(doc)?;
        let conn = self.conn.lock();
        conn.execute(
            &format!("INSERT INTO {} (id, doc) VALUES (?1, ?2)", T::COLLECTION),
            params![doc.id().to_string(), raw],
        )?;
        Ok(())
    }

    async fn replace_one(&self, id: Uuid, doc: &T) -> Result<bool, StoreError> {
        let raw = serde_json::to_string(doc)?;
        let conn = self.conn.lock();
        let changed = conn.execute(
            &format!("UPDATE {} SET doc = ?2 WHERE id = ?1", T::COLLECTION),
            params![id.to_string(), raw],
        )?;
        Ok(changed > 0)
    }
}
