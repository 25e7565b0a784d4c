//! In-memory TTL cache of normalized records with stale-read fallback.
//!
//! Entries are never evicted on expiry: an entry past its TTL stops being
//! served by [`CacheStore::get`] but stays available to
//! [`CacheStore::get_ignoring_ttl`] so outages can fall back to it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::{FeedKey, NormalizedRecord, UtcDateTime};

/// Defines how the orchestrator consults the cache for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a fresh entry without touching the network; otherwise fetch,
    /// and fall back to a stale entry on failure. (Default)
    #[default]
    Use,
    /// Always fetch from the network and write the response to the cache.
    /// A stale entry is still used as fallback when the fetch fails.
    Refresh,
}

/// Cached record plus the metadata needed to judge its freshness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub key: FeedKey,
    pub record: NormalizedRecord,
    pub fetched_at: UtcDateTime,
    pub ttl: Duration,
}

impl CacheEntry {
    /// Fresh while strictly less than `ttl` has elapsed since the fetch.
    pub fn is_fresh(&self, now: UtcDateTime) -> bool {
        now.duration_since(self.fetched_at) < self.ttl
    }

    pub fn age(&self, now: UtcDateTime) -> Duration {
        now.duration_since(self.fetched_at)
    }
}

/// Thread-safe record cache keyed by [`FeedKey`].
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<tokio::sync::RwLock<HashMap<FeedKey, CacheEntry>>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl CacheStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Returns the entry for `key` only if it is still within its TTL.
    pub async fn get(&self, key: &FeedKey) -> Option<CacheEntry> {
        let now = self.clock.now();
        let store = self.inner.read().await;
        store.get(key).filter(|entry| entry.is_fresh(now)).cloned()
    }

    /// Returns the latest entry for `key` regardless of age.
    pub async fn get_ignoring_ttl(&self, key: &FeedKey) -> Option<CacheEntry> {
        let store = self.inner.read().await;
        store.get(key).cloned()
    }

    /// Stores `record` under `key`, stamped with the current time.
    ///
    /// Overwrites any previous entry for the same key.
    pub async fn put(&self, key: FeedKey, record: NormalizedRecord, ttl: Duration) -> CacheEntry {
        let entry = CacheEntry {
            key: key.clone(),
            record,
            fetched_at: self.clock.now(),
            ttl,
        };
        let mut store = self.inner.write().await;
        store.insert(key, entry.clone());
        entry
    }

    pub fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.is_fresh(self.clock.now())
    }

    pub fn now(&self) -> UtcDateTime {
        self.clock.now()
    }

    /// Number of entries, fresh or stale.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::synthesize;
    use crate::clock::ManualClock;
    use crate::{Feed, FeedKind};

    fn clock() -> ManualClock {
        ManualClock::new(UtcDateTime::parse("2026-10-16T00:00:00Z").expect("valid timestamp"))
    }

    fn record() -> NormalizedRecord {
        synthesize(
            FeedKind::Seismic,
            UtcDateTime::parse("2026-10-15T23:59:00Z").expect("valid timestamp"),
        )
    }

    #[tokio::test]
    async fn fresh_entry_is_served_until_ttl_elapses() {
        let clock = clock();
        let cache = CacheStore::new(Arc::new(clock.clone()));
        let key = FeedKey::plain(Feed::SeismicNormal).unwrap();

        assert!(cache.get(&key).await.is_none());
        cache.put(key.clone(), record(), Duration::from_secs(60)).await;
        assert!(cache.get(&key).await.is_some());

        clock.advance(Duration::from_secs(59));
        assert!(cache.get(&key).await.is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn stale_entry_remains_readable_ignoring_ttl() {
        let clock = clock();
        let cache = CacheStore::new(Arc::new(clock.clone()));
        let key = FeedKey::plain(Feed::Tsunami).unwrap();

        let stored = cache.put(key.clone(), record(), Duration::from_secs(60)).await;
        clock.advance(Duration::from_secs(3_600));

        let stale = cache.get_ignoring_ttl(&key).await.expect("stale entry kept");
        assert_eq!(stale, stored);
        assert!(!cache.is_fresh(&stale));
        assert_eq!(stale.age(cache.now()), Duration::from_secs(3_600));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn put_overwrites_and_restamps() {
        let clock = clock();
        let cache = CacheStore::new(Arc::new(clock.clone()));
        let key = FeedKey::plain(Feed::SeismicNormal).unwrap();

        cache.put(key.clone(), record(), Duration::from_secs(60)).await;
        clock.advance(Duration::from_secs(120));
        cache.put(key.clone(), record(), Duration::from_secs(60)).await;

        let entry = cache.get(&key).await.expect("restamped entry is fresh");
        assert_eq!(entry.fetched_at, clock.now());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn selectors_never_share_entries() {
        let cache = CacheStore::new(Arc::new(clock()));
        let taipei = FeedKey::new(Feed::StationObservationById, Some("466920")).unwrap();
        let tainan = FeedKey::new(Feed::StationObservationById, Some("467410")).unwrap();

        cache.put(taipei.clone(), record(), Duration::from_secs(600)).await;

        assert!(cache.get(&taipei).await.is_some());
        assert!(cache.get(&tainan).await.is_none());
        assert!(cache.get_ignoring_ttl(&tainan).await.is_none());
    }

    #[tokio::test]
    async fn zero_ttl_is_never_fresh() {
        let cache = CacheStore::new(Arc::new(clock()));
        let key = FeedKey::plain(Feed::SeismicSmallArea).unwrap();

        cache.put(key.clone(), record(), Duration::ZERO).await;

        assert!(cache.get(&key).await.is_none());
        assert!(!cache.is_empty().await);
    }

    #[test]
    fn cache_mode_defaults_to_use() {
        assert_eq!(CacheMode::default(), CacheMode::Use);
    }
}
