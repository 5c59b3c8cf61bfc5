//! # pathkv-store
//!
//! A key-value store addressed by dotted paths. `"user.age"` names the
//! field `age` inside the record `user`.
//!
//! Each top-level key is one row in a SQLite or Postgres table, holding
//! the record's value as JSON text. Decoded records are mirrored in
//! memory so repeated reads skip the database.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  PathStore  (get / set / has / push ..)  │
//! ├─────────────────────────────────────────┤
//! │  KeyPath + tree  (parse, lookup, merge)  │
//! │  CacheMirror     (moka, per store)       │
//! ├─────────────────────────────────────────┤
//! │  PersistenceBridge (JSON codec)          │
//! │  Backend: SqliteBackend | PostgresBackend│
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use pathkv_store::{PathStore, StoreConfig};
//! use serde_json::json;
//!
//! let store = PathStore::open(&StoreConfig::sqlite("db.sqlite", "userinfo")).await?;
//! store.set("user", json!({"name": "Alex"})).await?;
//! store.set("user.age", json!(33)).await?;
//! assert_eq!(store.get("user.age", None).await?, json!(33));
//! ```

pub mod backend;
pub mod cache;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod path;
pub mod store;
pub mod tree;

// ── re-exports ───────────────────────────────────────────────────────

pub use backend::{Backend, PersistenceBridge, PostgresBackend, SqliteBackend};
pub use cache::{CacheMirror, CacheStats};
pub use config::{BackendConfig, PostgresConfig, StoreConfig};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use path::KeyPath;
pub use store::PathStore;
