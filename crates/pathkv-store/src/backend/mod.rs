//! Persistence bridge: one row per top-level key, value as JSON text.
//!
//! A [`Backend`] only moves text in and out of a table. The
//! [`PersistenceBridge`] pairs a backend with the [`crate::codec`] so the
//! rest of the crate deals in decoded values. No call is ever retried.

pub mod postgres;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::codec;
use crate::error::{StoreError, StoreResult};

pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;

/// Raw row access for one key-value table.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for logs (`"sqlite"`, `"postgres"`).
    fn name(&self) -> &'static str;

    /// Create the table if it does not exist yet.
    async fn init_schema(&self) -> StoreResult<()>;

    /// Point lookup by primary key.
    async fn load(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert the row or replace its value. Idempotent.
    async fn upsert(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete the row. Returns whether it existed.
    async fn remove(&self, key: &str) -> StoreResult<bool>;

    /// Every row as `(key, value)`, ordered by key.
    async fn scan(&self) -> StoreResult<Vec<(String, String)>>;
}

/// A [`Backend`] plus the JSON codec.
#[derive(Clone)]
pub struct PersistenceBridge {
    backend: Arc<dyn Backend>,
}

impl PersistenceBridge {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn init_schema(&self) -> StoreResult<()> {
        self.backend.init_schema().await
    }

    /// Load and decode the record for `key`.
    pub async fn load_value(&self, key: &str) -> StoreResult<Option<Value>> {
        let Some(raw) = self.backend.load(key).await? else {
            debug!(backend = self.backend.name(), key, "record not found");
            return Ok(None);
        };
        codec::decode(key, &raw)
            .inspect_err(|e| warn!(backend = self.backend.name(), key, error = %e, "corrupt record"))
            .map(Some)
    }

    /// Encode and upsert the record for `key`.
    pub async fn upsert_value(&self, key: &str, value: &Value) -> StoreResult<()> {
        let text = codec::encode(value)?;
        self.backend.upsert(key, &text).await?;
        debug!(backend = self.backend.name(), key, bytes = text.len(), "record persisted");
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> StoreResult<bool> {
        self.backend.remove(key).await
    }

    /// Decode every row. The first undecodable row aborts the scan.
    pub async fn scan_values(&self) -> StoreResult<Map<String, Value>> {
        let rows = self.backend.scan().await?;
        let mut records = Map::new();
        for (key, raw) in rows {
            let value = codec::decode(&key, &raw)?;
            records.insert(key, value);
        }
        Ok(records)
    }
}

/// Reject table names that are not plain SQL identifiers.
///
/// Table names are interpolated into statements, so only
/// `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub fn validate_table_name(table: &str) -> StoreResult<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidArgument(format!(
            "table name `{table}` must match [A-Za-z_][A-Za-z0-9_]*"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_name_validation() {
        for ok in ["userinfo", "_kv", "t1", "Data_2"] {
            assert!(validate_table_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "1abc", "user info", "kv;drop", "a-b", "ünï"] {
            assert!(validate_table_name(bad).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn bridge_decodes_rows() {
        let backend = SqliteBackend::in_memory("kv").unwrap();
        let bridge = PersistenceBridge::new(Arc::new(backend));
        bridge.init_schema().await.unwrap();

        bridge.upsert_value("a", &json!({"x": 1})).await.unwrap();
        assert_eq!(bridge.load_value("a").await.unwrap(), Some(json!({"x": 1})));
        assert_eq!(bridge.load_value("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn bridge_surfaces_corrupt_rows() {
        let backend = Arc::new(SqliteBackend::in_memory("kv").unwrap());
        backend.init_schema().await.unwrap();
        backend.upsert("bad", "{truncated").await.unwrap();

        let bridge = PersistenceBridge::new(backend);
        let err = bridge.load_value("bad").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { ref key, .. } if key == "bad"));
        assert!(bridge.scan_values().await.is_err());
    }
}
