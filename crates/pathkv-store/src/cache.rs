//! In-memory mirror of decoded records, backed by [`moka`].
//!
//! The mirror maps a top-level key to the value tree most recently
//! persisted for it. It is owned by one [`crate::PathStore`] and lives as
//! long as that store. Entries are never evicted or expired; they only
//! leave through [`CacheMirror::invalidate`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::future::Cache;
use serde_json::Value;
use tracing::debug;

// ── cache stats ──────────────────────────────────────────────────────

/// Hit and miss counters for one mirror, shared by its clones.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Every `get` since creation or the last reset.
    pub fn lookups(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Fraction of lookups served from memory; `None` before any lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        match self.lookups() {
            0 => None,
            n => Some(self.hits() as f64 / n as f64),
        }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hits / {} misses", self.hits(), self.misses())?;
        if let Some(rate) = self.hit_rate() {
            write!(f, " ({:.1}% hit)", rate * 100.0)?;
        }
        Ok(())
    }
}

// ── mirror ───────────────────────────────────────────────────────────

/// Top-level key to decoded record value.
///
/// Cloning is cheap and clones share the same entries and stats.
#[derive(Clone)]
pub struct CacheMirror {
    name: String,
    inner: Cache<String, Value>,
    stats: Arc<CacheStats>,
}

impl CacheMirror {
    /// Create an empty, unbounded mirror labelled `name` in logs.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug!(cache = %name, "cache mirror created");
        Self {
            name,
            inner: Cache::builder().build(),
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Look up the record for `key`. Returns `None` on miss.
    pub async fn get(&self, key: &str) -> Option<Value> {
        match self.inner.get(key).await {
            Some(value) => {
                self.stats.record(true);
                debug!(cache = %self.name, key, "cache hit");
                Some(value)
            }
            None => {
                self.stats.record(false);
                debug!(cache = %self.name, key, "cache miss");
                None
            }
        }
    }

    /// Store `value` as the current record for `key`.
    pub async fn insert(&self, key: &str, value: Value) {
        self.inner.insert(key.to_string(), value).await;
        debug!(cache = %self.name, key, "cache insert");
    }

    /// Whether `key` is mirrored. Does not touch the stats.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Drop the entry for `key`.
    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
        debug!(cache = %self.name, key, "cache invalidate");
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
        debug!(cache = %self.name, "cache invalidate_all");
    }

    /// Approximate number of entries (moka counts lazily).
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl fmt::Debug for CacheMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheMirror")
            .field("name", &self.name)
            .field("stats", &self.stats)
            .finish()
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_and_get() {
        let cache = CacheMirror::new("test");
        cache.insert("user", json!({"name": "Alex"})).await;
        assert_eq!(cache.get("user").await, Some(json!({"name": "Alex"})));
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let cache = CacheMirror::new("test");
        assert_eq!(cache.get("nonexistent").await, None);
    }

    #[tokio::test]
    async fn insert_overwrites() {
        let cache = CacheMirror::new("test");
        cache.insert("k", json!(1)).await;
        cache.insert("k", json!(2)).await;
        assert_eq!(cache.get("k").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn contains_tracks_inserts_and_invalidation() {
        let cache = CacheMirror::new("test");
        assert!(!cache.contains("k"));
        cache.insert("k", json!("v")).await;
        assert!(cache.contains("k"));
        cache.invalidate("k").await;
        assert!(!cache.contains("k"));
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn invalidate_all_clears_cache() {
        let cache = CacheMirror::new("test");
        cache.insert("a", json!(1)).await;
        cache.insert("b", json!(2)).await;

        cache.invalidate_all();

        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_none());
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let cache = CacheMirror::new("test");
        let other = cache.clone();
        cache.insert("k", json!(true)).await;
        assert_eq!(other.get("k").await, Some(json!(true)));
        assert_eq!(cache.stats().hits(), 1);
    }

    #[tokio::test]
    async fn stats_tracking() {
        let cache = CacheMirror::new("test");
        cache.insert("k", json!(3)).await;

        // 1 hit
        let _ = cache.get("k").await;
        // 2 misses
        let _ = cache.get("nope1").await;
        let _ = cache.get("nope2").await;

        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 2);
        assert_eq!(cache.stats().lookups(), 3);
        let rate = cache.stats().hit_rate().unwrap();
        assert!((rate - (1.0 / 3.0)).abs() < 0.01);
    }

    #[test]
    fn stats_display() {
        let stats = CacheStats::default();
        stats.hits.store(3, Ordering::Relaxed);
        stats.misses.store(1, Ordering::Relaxed);
        assert_eq!(stats.to_string(), "3 hits / 1 misses (75.0% hit)");
    }

    #[test]
    fn stats_display_without_lookups() {
        assert_eq!(CacheStats::default().to_string(), "0 hits / 0 misses");
    }

    #[test]
    fn stats_reset() {
        let stats = CacheStats::default();
        stats.record(true);
        stats.record(false);
        stats.reset();
        assert_eq!(stats.lookups(), 0);
        assert_eq!(stats.hit_rate(), None);
    }
}
