//! In-memory snapshot cache.
//!
//! Plugs into the interceptor as a hook: `before` serves a cached snapshot
//! and skips the fetch, `after` stores what was fetched.

use crate::config::CacheConfig;
use crate::interceptor::InterceptHook;
use crate::snapshot::SnapshotResult;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// Snapshot cache keyed by canonical URL.
pub struct SnapshotCache {
    inner: Cache<String, SnapshotResult>,
}

impl SnapshotCache {
    /// Create a new cache with the given parameters.
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { inner }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, Duration::from_secs(config.ttl_seconds))
    }

    /// Get a snapshot from the cache.
    pub async fn get(&self, url: &str) -> Option<SnapshotResult> {
        self.inner.get(url).await
    }

    /// Insert a snapshot into the cache.
    pub async fn insert(&self, url: impl Into<String>, snapshot: SnapshotResult) {
        self.inner.insert(url.into(), snapshot).await;
    }

    /// Get the current entry count.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Invalidate all entries.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

#[async_trait]
impl InterceptHook for SnapshotCache {
    async fn before(&self, url: &str) -> anyhow::Result<Option<SnapshotResult>> {
        let cached = self.get(url).await;
        if cached.is_some() {
            debug!(url = %url, "Snapshot cache hit");
        }
        Ok(cached)
    }

    async fn after(&self, url: &str, snapshot: &SnapshotResult) -> anyhow::Result<()> {
        // Server errors from the rendered page are transient. An existing
        // entry is left alone so a cache hit does not restart its TTL.
        if snapshot.status < 500 {
            self.inner
                .entry(url.to_string())
                .or_insert(snapshot.clone())
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_basic() {
        let cache = SnapshotCache::new(100, Duration::from_secs(60));

        cache.insert("http://a/", SnapshotResult::new(200, "a")).await;

        let value = cache.get("http://a/").await;
        assert_eq!(value.map(|s| s.html), Some("a".to_string()));
        assert!(cache.get("http://missing/").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_expiry() {
        let cache = SnapshotCache::new(100, Duration::from_millis(50));

        cache.insert("key", SnapshotResult::new(200, "x")).await;
        assert!(cache.get("key").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get("key").await.is_none());
    }

    #[tokio::test]
    async fn test_hook_round_trip() {
        let cache = SnapshotCache::from_config(&CacheConfig::default());
        assert_eq!(cache.before("http://a/").await.unwrap(), None);

        cache
            .after("http://a/", &SnapshotResult::new(200, "page"))
            .await
            .unwrap();
        let hit = cache.before("http://a/").await.unwrap().unwrap();
        assert_eq!(hit.html, "page");
    }

    #[tokio::test]
    async fn test_after_does_not_refresh_existing_entry() {
        let cache = SnapshotCache::new(10, Duration::from_millis(200));
        cache.after("k", &SnapshotResult::new(200, "first")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        cache.after("k", &SnapshotResult::new(200, "second")).await.unwrap();
        assert_eq!(cache.get("k").await.map(|s| s.html), Some("first".to_string()));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_server_errors_not_cached() {
        let cache = SnapshotCache::new(10, Duration::from_secs(60));
        cache
            .after("http://a/", &SnapshotResult::new(503, "busy"))
            .await
            .unwrap();
        assert!(cache.get("http://a/").await.is_none());
    }
}
