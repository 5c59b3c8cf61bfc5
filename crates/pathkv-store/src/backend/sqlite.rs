//! Embedded file-backed backend over [`Database`].

use std::path::Path;

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tracing::{debug, info, instrument};

use super::{Backend, validate_table_name};
use crate::db::Database;
use crate::error::StoreResult;

/// One SQLite table holding `(id, key, value)` rows.
#[derive(Clone)]
pub struct SqliteBackend {
    db: Database,
    table: String,
}

impl SqliteBackend {
    /// Use `table` inside an already opened database.
    pub fn new(db: Database, table: impl Into<String>) -> StoreResult<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { db, table })
    }

    /// Open (or create) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>, table: impl Into<String>) -> StoreResult<Self> {
        let db = Database::open_async(path).await?;
        Self::new(db, table)
    }

    /// Private in-memory database; contents vanish on drop.
    pub fn in_memory(table: impl Into<String>) -> StoreResult<Self> {
        Self::new(Database::open_in_memory()?, table)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn init_schema(&self) -> StoreResult<()> {
        // The index covers tables created without a UNIQUE key column;
        // upsert's ON CONFLICT(key) needs one. Duplicate keys already in
        // such a table make this fail.
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id    INTEGER PRIMARY KEY AUTOINCREMENT,
                key   TEXT NOT NULL UNIQUE,
                value TEXT
            );
            CREATE UNIQUE INDEX IF NOT EXISTS {table}_key_idx ON {table} (key);",
            table = self.table
        );
        let table = self.table.clone();
        self.db
            .execute(move |conn| {
                conn.execute_batch(&sql)?;
                info!(table = %table, "sqlite schema ready");
                Ok(())
            })
            .await
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn load(&self, key: &str) -> StoreResult<Option<String>> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", self.table);
        let key = key.to_string();
        self.db
            .execute(move |conn| {
                let value = conn
                    .query_row(&sql, rusqlite::params![key], |row| {
                        row.get::<_, Option<String>>(0)
                    })
                    .optional()?;
                // A NULL value column reads as JSON null.
                Ok(value.map(|v| v.unwrap_or_else(|| "null".to_string())))
            })
            .await
    }

    #[instrument(skip(self, value), fields(table = %self.table))]
    async fn upsert(&self, key: &str, value: &str) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {} (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            self.table
        );
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .execute(move |conn| {
                conn.execute(&sql, rusqlite::params![key, value])?;
                debug!(key = %key, "row upserted");
                Ok(())
            })
            .await
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn remove(&self, key: &str) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", self.table);
        let key = key.to_string();
        self.db
            .execute(move |conn| {
                let deleted = conn.execute(&sql, rusqlite::params![key])?;
                Ok(deleted > 0)
            })
            .await
    }

    async fn scan(&self) -> StoreResult<Vec<(String, String)>> {
        let sql = format!("SELECT key, value FROM {} ORDER BY key", self.table);
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| {
                        let key: String = row.get(0)?;
                        let value: Option<String> = row.get(1)?;
                        Ok((key, value.unwrap_or_else(|| "null".to_string())))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                debug!(rows = rows.len(), "sqlite scan complete");
                Ok(rows)
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> SqliteBackend {
        let backend = SqliteBackend::in_memory("userinfo").unwrap();
        backend.init_schema().await.unwrap();
        backend
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let backend = setup().await;
        assert!(backend.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_then_load() {
        let backend = setup().await;
        backend.upsert("user", r#"{"name":"Alex"}"#).await.unwrap();
        assert_eq!(
            backend.load("user").await.unwrap().as_deref(),
            Some(r#"{"name":"Alex"}"#)
        );
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let backend = setup().await;
        backend.upsert("k", "1").await.unwrap();
        backend.upsert("k", "1").await.unwrap();

        let rows = backend.scan().await.unwrap();
        assert_eq!(rows, vec![("k".to_string(), "1".to_string())]);
    }

    #[tokio::test]
    async fn upsert_overwrites_value_and_keeps_id() {
        let backend = setup().await;
        backend.upsert("k", "1").await.unwrap();
        backend.upsert("k", "2").await.unwrap();

        let (count, id): (i64, i64) = backend
            .database()
            .execute(|conn| {
                Ok(conn.query_row("SELECT count(*), max(id) FROM userinfo", [], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(id, 1);
        assert_eq!(backend.load("k").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn remove_reports_existence() {
        let backend = setup().await;
        backend.upsert("k", "true").await.unwrap();
        assert!(backend.remove("k").await.unwrap());
        assert!(!backend.remove("k").await.unwrap());
        assert!(backend.load("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scan_is_ordered_by_key() {
        let backend = setup().await;
        backend.upsert("b", "2").await.unwrap();
        backend.upsert("a", "1").await.unwrap();
        let keys: Vec<String> = backend
            .scan()
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn init_schema_twice_is_harmless() {
        let backend = setup().await;
        backend.upsert("k", "1").await.unwrap();
        backend.init_schema().await.unwrap();
        assert_eq!(backend.load("k").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn upsert_works_on_table_without_unique_key() {
        let backend = SqliteBackend::in_memory("legacy").unwrap();
        backend
            .database()
            .execute(|conn| {
                conn.execute_batch(
                    "CREATE TABLE legacy (id INTEGER PRIMARY KEY AUTOINCREMENT, key TEXT, value TEXT);
                     INSERT INTO legacy (key, value) VALUES ('user', '{\"name\":\"Alex\"}');",
                )?;
                Ok(())
            })
            .await
            .unwrap();

        backend.init_schema().await.unwrap();
        backend.upsert("user", r#"{"name":"Sam"}"#).await.unwrap();
        backend.upsert("other", "1").await.unwrap();

        assert_eq!(
            backend.scan().await.unwrap(),
            vec![
                ("other".to_string(), "1".to_string()),
                ("user".to_string(), r#"{"name":"Sam"}"#.to_string()),
            ]
        );
    }

    #[test]
    fn rejects_bad_table_name() {
        assert!(SqliteBackend::in_memory("drop table").is_err());
    }
}
