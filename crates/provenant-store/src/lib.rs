//! Provenant Storage Layer
//!
//! Implements the DocumentStore trait on top of SQLite.
//!
//! # Architecture
//!
//! - One `documents` table keyed by (kind, id)
//! - Document bodies stored as JSON text, filtered with SQLite's JSON functions
//! - Array appends performed inside an IMMEDIATE transaction so concurrent
//!   writers on the same document cannot lose each other's elements
//!
//! # Examples
//!
//! ```no_run
//! use provenant_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for document operations
//! ```

#![warn(missing_docs)]

use provenant_domain::document::{self, ID_FIELD};
use provenant_domain::traits::DocumentStore;
use provenant_domain::{Document, DocumentFilter, FieldCondition, Projection, TloId, TloKind};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// How long a writer waits for another connection's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored body is not valid JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// SQLite-based implementation of DocumentStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteStore instance; several instances may share one database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use provenant_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("provenant.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create a store backed by a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Number of stored documents of one kind
    pub fn count(&self, kind: TloKind) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Build a JSON path for a top-level field
    fn field_path(field: &str) -> Result<String, StoreError> {
        if field.is_empty() || field.contains('"') {
            return Err(StoreError::InvalidData(format!(
                "Unsupported field name: {:?}",
                field
            )));
        }
        Ok(format!("$.\"{}\"", field))
    }

    fn parse_body(body: &str) -> Result<Document, StoreError> {
        match serde_json::from_str(body)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::InvalidData(
                "Stored document is not a JSON object".to_string(),
            )),
        }
    }

    fn placeholders(count: usize) -> String {
        vec!["?"; count].join(", ")
    }
}

impl DocumentStore for SqliteStore {
    type Error = StoreError;

    fn find_by_id(&self, kind: TloKind, id: &TloId) -> Result<Option<Document>, Self::Error> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        body.as_deref().map(Self::parse_body).transpose()
    }

    fn find(
        &self,
        kind: TloKind,
        filter: &DocumentFilter,
        projection: &Projection,
    ) -> Result<Vec<Document>, Self::Error> {
        let mut sql = String::from("SELECT body FROM documents WHERE kind = ?");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(kind.as_str())];

        if let Some(ids) = &filter.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(" AND id IN ({})", Self::placeholders(ids.len())));
            for id in ids {
                params.push(Box::new(id.to_string()));
            }
        }

        if let Some(version) = filter.schema_version_below {
            sql.push_str(" AND COALESCE(json_extract(body, '$.schema_version'), 0) < ?");
            params.push(Box::new(version as i64));
        }

        if let Some(after) = &filter.id_after {
            sql.push_str(" AND id > ?");
            params.push(Box::new(after.to_string()));
        }

        if let Some(names) = &filter.source_names {
            if names.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(documents.body, '$.source') AS s \
                 WHERE json_extract(s.value, '$.name') IN ({}))",
                Self::placeholders(names.len())
            ));
            for name in names {
                params.push(Box::new(name.clone()));
            }
        }

        for condition in &filter.conditions {
            match condition {
                FieldCondition::Equals { field, value } => {
                    sql.push_str(" AND json_extract(body, ?) = ?");
                    params.push(Box::new(Self::field_path(field)?));
                    params.push(Box::new(value.clone()));
                }
                FieldCondition::Absent { field } => {
                    sql.push_str(" AND COALESCE(json_extract(body, ?), '') = ''");
                    params.push(Box::new(Self::field_path(field)?));
                }
            }
        }

        sql.push_str(" ORDER BY id");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let bodies = stmt
            .query_map(&param_refs[..], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|body| Self::parse_body(body).map(|doc| projection.apply(doc)))
            .collect()
    }

    fn replace(&mut self, kind: TloKind, doc: &Document) -> Result<(), Self::Error> {
        let id = document::id_of(doc).ok_or_else(|| {
            StoreError::InvalidData(format!("Document has no valid '{}' field", ID_FIELD))
        })?;
        let body = serde_json::to_string(doc)?;

        self.conn.execute(
            "INSERT INTO documents (kind, id, body) VALUES (?1, ?2, ?3)
             ON CONFLICT(kind, id) DO UPDATE SET body = excluded.body",
            params![kind.as_str(), id.to_string(), body],
        )?;

        Ok(())
    }

    fn delete_by_id(&mut self, kind: TloKind, id: &TloId) -> Result<bool, Self::Error> {
        let deleted = self.conn.execute(
            "DELETE FROM documents WHERE kind = ?1 AND id = ?2",
            params![kind.as_str(), id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    fn append_to_array(
        &mut self,
        kind: TloKind,
        id: &TloId,
        field: &str,
        value: Value,
    ) -> Result<bool, Self::Error> {
        // IMMEDIATE takes the write lock up front, so the read below cannot
        // be invalidated by another writer before we write back
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(body) = body else {
            return Ok(false);
        };

        let mut doc = Self::parse_body(&body)?;
        if doc.get(field).map_or(true, Value::is_null) {
            doc.insert(field.to_string(), Value::Array(Vec::new()));
        }

        let items = match doc.get_mut(field) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(StoreError::InvalidData(format!(
                    "Field '{}' of {} {} is not an array",
                    field, kind, id
                )))
            }
        };

        if items.contains(&value) {
            return Ok(false);
        }
        items.push(value);

        tx.execute(
            "UPDATE documents SET body = ?1 WHERE kind = ?2 AND id = ?3",
            params![serde_json::to_string(&doc)?, kind.as_str(), id.to_string()],
        )?;
        tx.commit()?;

        Ok(true)
    }
}
