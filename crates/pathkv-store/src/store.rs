//! The path-addressed store: resolve, check the mirror, load or create,
//! mutate, persist, then update the mirror.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::backend::{Backend, PersistenceBridge, PostgresBackend, SqliteBackend};
use crate::cache::CacheMirror;
use crate::config::{BackendConfig, StoreConfig};
use crate::error::StoreResult;
use crate::path::KeyPath;
use crate::tree;

/// Read and write nested fields of JSON records by dotted key.
///
/// Each top-level key is one row in the backing table; everything after
/// the first `.` addresses a field inside that row's value.
///
/// # Concurrency
///
/// There is no per-key locking. [`PathStore::set`] is a read-modify-write
/// across the mirror and the backing row, so two concurrent writes to the
/// same top-level key can lose an update (the last upsert wins). Callers
/// that write one key from several tasks must serialize those writes
/// themselves.
#[derive(Clone)]
pub struct PathStore {
    bridge: PersistenceBridge,
    cache: CacheMirror,
}

impl PathStore {
    /// Wrap `backend`. Call [`PathStore::init`] before use.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let cache = CacheMirror::new(backend.name());
        Self {
            bridge: PersistenceBridge::new(backend),
            cache,
        }
    }

    /// Build the configured backend and run [`PathStore::init`].
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let backend: Arc<dyn Backend> = match &config.backend {
            BackendConfig::Sqlite { path, table } => {
                Arc::new(SqliteBackend::open(path, table.clone()).await?)
            }
            BackendConfig::Postgres(pg) => Arc::new(PostgresBackend::connect_lazy(pg)?),
        };
        let store = Self::new(backend);
        store.init(config.preload).await?;
        Ok(store)
    }

    /// Create the table if needed; with `preload`, mirror every row.
    pub async fn init(&self, preload: bool) -> StoreResult<()> {
        self.bridge.init_schema().await?;
        if preload {
            let records = self.bridge.scan_values().await?;
            let count = records.len();
            for (key, value) in records {
                self.cache.insert(&key, value).await;
            }
            info!(backend = self.bridge.backend_name(), records = count, "cache preloaded");
        }
        Ok(())
    }

    /// Read the value at `key`.
    ///
    /// An unknown record is created on first read by storing the fallback
    /// (`default`, or `""`) at `key`. A missing location yields the
    /// fallback; a stored `null` is returned as is. A key without a `.`
    /// returns the whole record.
    #[instrument(skip(self, default))]
    pub async fn get(&self, key: &str, default: Option<Value>) -> StoreResult<Value> {
        let path = KeyPath::parse(key);
        let fallback = default.unwrap_or_else(empty_value);

        let record = match self.record(&path.top).await? {
            Some(record) => record,
            None => {
                debug!(top = %path.top, "materializing record on read");
                self.set(key, fallback.clone()).await?
            }
        };

        Ok(tree::lookup(&record, &path.rest)
            .cloned()
            .unwrap_or(fallback))
    }

    /// Same as [`PathStore::get`].
    pub async fn fetch(&self, key: &str, default: Option<Value>) -> StoreResult<Value> {
        self.get(key, default).await
    }

    /// Write `value` at `key` and return the resulting record.
    ///
    /// A key without a `.` replaces the record. A nested key merges into
    /// the record, keeping sibling fields; `null` deletes the field
    /// instead. The mirror is updated only after the row is persisted.
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: Value) -> StoreResult<Value> {
        let path = KeyPath::parse(key);

        let record = if path.is_whole_record() {
            value
        } else {
            let mut record = self
                .record(&path.top)
                .await?
                .unwrap_or_else(|| Value::Object(Map::new()));
            tree::assign(&mut record, &path.rest, value);
            record
        };

        self.commit(&path.top, record.clone()).await?;
        Ok(record)
    }

    /// Whether `key` exists.
    ///
    /// For a nested key this reads the record through [`PathStore::get`],
    /// so an unknown record is created as a side effect, then tests that
    /// the field chain exists (a `null` field counts). For a plain key it
    /// only reports whether the record exists and creates nothing.
    #[instrument(skip(self))]
    pub async fn has(&self, key: &str) -> StoreResult<bool> {
        let path = KeyPath::parse(key);
        if path.is_whole_record() {
            return Ok(self.record(&path.top).await?.is_some());
        }
        let record = self.get(&path.top, None).await?;
        Ok(tree::contains(&record, &path.rest))
    }

    /// Append each of `values` to the sequence at `key`, one full
    /// read-merge-persist cycle per value.
    ///
    /// A falsy current value starts a new sequence; a non-sequence value
    /// becomes the first element. Returns the final value at `key`.
    #[instrument(skip(self, values))]
    pub async fn push<I>(&self, key: &str, values: I) -> StoreResult<Value>
    where
        I: IntoIterator<Item = Value>,
    {
        for value in values {
            let current = self.get(key, None).await?;
            let next = match current {
                Value::Array(mut items) => {
                    items.push(value);
                    items
                }
                current if tree::is_falsy(&current) => vec![value],
                current => vec![current, value],
            };
            self.set(key, Value::Array(next)).await?;
        }
        self.get(key, None).await
    }

    /// Every persisted record, decoded.
    ///
    /// Always reads the backing store and neither consults nor fills the
    /// mirror, so it reflects persisted state, including rows written by
    /// other processes.
    pub async fn all(&self) -> StoreResult<Map<String, Value>> {
        self.bridge.scan_values().await
    }

    /// Remove `key`. Returns whether something was removed.
    ///
    /// A plain key deletes the whole row and its mirror entry. A nested
    /// key deletes one field from an existing record and never creates a
    /// record.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        let path = KeyPath::parse(key);
        if path.is_whole_record() {
            let existed = self.bridge.remove(&path.top).await?;
            self.cache.invalidate(&path.top).await;
            debug!(top = %path.top, existed, "record deleted");
            return Ok(existed);
        }

        let Some(mut record) = self.record(&path.top).await? else {
            return Ok(false);
        };
        if !tree::remove(&mut record, &path.rest) {
            return Ok(false);
        }
        self.commit(&path.top, record).await?;
        Ok(true)
    }

    /// The in-memory mirror, mostly for its stats.
    pub fn cache(&self) -> &CacheMirror {
        &self.cache
    }

    // ── internals ────────────────────────────────────────────────────

    /// The record for `top`: mirror first, then the backing store.
    async fn record(&self, top: &str) -> StoreResult<Option<Value>> {
        if let Some(record) = self.cache.get(top).await {
            return Ok(Some(record));
        }
        let loaded = self.bridge.load_value(top).await?;
        if let Some(record) = &loaded {
            self.cache.insert(top, record.clone()).await;
        }
        Ok(loaded)
    }

    /// Persist, then mirror.
    async fn commit(&self, top: &str, record: Value) -> StoreResult<()> {
        self.bridge.upsert_value(top, &record).await?;
        self.cache.insert(top, record).await;
        Ok(())
    }
}

fn empty_value() -> Value {
    Value::String(String::new())
}

// ── tests ────────────────────────────────────────────────────────────
