//! Tagged response cache.
//!
//! Stores pre-serialized payloads by key. Every entry carries a set of tags
//! and an expiry; [`TaggedCache::invalidate_tag`] drops all entries sharing a
//! tag in one call, which is how mutations keep cached listings from going
//! stale.
//!
//! Concurrent misses on the same key may both run their producer. Producers
//! are expected to be idempotent reads, so the last writer simply wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, trace};

/// When a mutation drops cached payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationMode {
    /// Before the request body is even parsed, so failed mutations also invalidate.
    #[default]
    Eager,
    /// Only once the write has been committed.
    AfterCommit,
}

/// Cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a cached payload in seconds.
    pub ttl_secs: u64,
    /// How often expired entries are swept, in seconds.
    pub sweep_interval_secs: u64,
    pub invalidation: InvalidationMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 240,
            sweep_interval_secs: 60,
            invalidation: InvalidationMode::Eager,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Sweep interval, never shorter than one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<str>,
    tags: Vec<String>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Key/value cache with group-tag invalidation and per-entry TTL.
#[derive(Debug, Default)]
pub struct TaggedCache {
    entries: DashMap<String, CacheEntry>,
}

impl TaggedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if entry.is_expired(now) {
            drop(entry);
            // Only remove if nobody refreshed it in between.
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            return None;
        }
        Some(entry.value.clone())
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Arc<str>>, tags: &[&str], ttl: Duration) {
        let entry = CacheEntry {
            value: value.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.into(), entry);
    }

    /// Read-through lookup.
    ///
    /// Returns the cached value when present and unexpired. Otherwise awaits
    /// `producer`, stores its output under `tags` for `ttl`, and returns it.
    /// A producer error is returned as-is and nothing is stored.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: &str,
        tags: &[&str],
        ttl: Duration,
        producer: F,
    ) -> Result<Arc<str>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(value) = self.get(key) {
            debug!(key, "cache hit");
            return Ok(value);
        }

        debug!(key, "cache miss");
        let value: Arc<str> = producer().await?.into();
        self.insert(key, value.clone(), tags, ttl);
        Ok(value)
    }

    /// Remove every entry tagged with `tag`. Returns how many were removed.
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
        let removed = before.saturating_sub(self.entries.len());
        debug!(tag, removed, "invalidated cache tag");
        removed
    }

    /// Drop all expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            trace!(removed, "purged expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Spawn a task that periodically purges expired entries.
pub fn spawn_sweeper(cache: Arc<TaggedCache>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            cache.purge_expired();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(240);

    #[tokio::test]
    async fn test_hit_does_not_call_producer() {
        let cache = TaggedCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with("k", &["t"], TTL, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>("payload".to_string())
                })
                .await
                .unwrap();
            assert_eq!(&*value, "payload");
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_producer_error_is_not_cached() {
        let cache = TaggedCache::new();

        let result = cache
            .get_or_try_insert_with("k", &["t"], TTL, || async { Err::<String, _>("boom") })
            .await;
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.is_empty());

        let value = cache
            .get_or_try_insert_with("k", &["t"], TTL, || async { Ok::<_, &str>("ok".to_string()) })
            .await
            .unwrap();
        assert_eq!(&*value, "ok");
    }

    #[tokio::test]
    async fn test_invalidate_tag_only_removes_tagged_entries() {
        let cache = TaggedCache::new();
        cache.insert("users:list:1:10", "[]", &["usersCache"], TTL);
        cache.insert("users:detail:1", "{}", &["usersCache"], TTL);
        cache.insert("other", "x", &["otherCache"], TTL);

        assert_eq!(cache.invalidate_tag("usersCache"), 2);
        assert!(cache.get("users:list:1:10").is_none());
        assert!(cache.get("users:detail:1").is_none());
        assert_eq!(cache.get("other").as_deref(), Some("x"));

        assert_eq!(cache.invalidate_tag("usersCache"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = TaggedCache::new();
        cache.insert("k", "v", &["t"], TTL);

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_recomputed() {
        let cache = TaggedCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let produce = move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(format!("v{n}"))
        };

        let first = cache.get_or_try_insert_with("k", &["t"], TTL, produce).await.unwrap();
        tokio::time::advance(TTL).await;
        let second = cache.get_or_try_insert_with("k", &["t"], TTL, produce).await.unwrap();

        assert_eq!(&*first, "v0");
        assert_eq!(&*second, "v1");
    }

    #[test]
    fn test_config_parses_invalidation_mode() {
        let config: CacheConfig = serde_json::from_str(r#"{"invalidation":"after_commit"}"#).unwrap();
        assert_eq!(config.invalidation, InvalidationMode::AfterCommit);
        assert_eq!(config.ttl(), TTL);

        let config: CacheConfig = serde_json::from_str(r#"{"sweep_interval_secs":0}"#).unwrap();
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_in_background() {
        let cache = Arc::new(TaggedCache::new());
        cache.insert("k", "v", &["t"], Duration::from_secs(5));

        let handle = spawn_sweeper(cache.clone(), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert!(cache.is_empty());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = TaggedCache::new();
        cache.insert("short", "a", &["t"], Duration::from_secs(10));
        cache.insert("long", "b", &["t"], TTL);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long").as_deref(), Some("b"));
    }
}
