//! Cache Store Module
//!
//! Synchronous record of cached entries and in-flight fetch markers.
//! Every operation here runs to completion without suspending, so the
//! read-through accessor can combine a miss check and marker registration
//! in one critical section.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, CachedValue, FetchOutcome, InflightFetch, PendingFetch};

// == Cache Store ==
/// Key-value storage with lazy TTL expiry and single-flight markers.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Stored payloads
    entries: HashMap<String, CacheEntry>,
    /// Fetches currently running, at most one per key
    inflight: HashMap<String, InflightFetch>,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Returns the stored value if present and fresh.
    ///
    /// An expired entry is removed on the spot and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<CachedValue> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh_at(now) => {
                self.stats.record_hit();
                Some(Arc::clone(&entry.value))
            }
            Some(_) => {
                self.entries.remove(key);
                self.stats.record_expirations(1);
                self.stats.record_miss();
                debug!(key, "cache entry expired");
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores a value, replacing any existing entry and resetting its age.
    pub fn set(&mut self, key: String, value: CachedValue, ttl: Duration) {
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    // == Invalidate ==
    /// Removes the entry for `key` regardless of freshness.
    ///
    /// Any in-flight marker is detached as well: callers already waiting on
    /// it still get its result, but that result is not stored and the next
    /// lookup starts a new fetch. Returns true if anything was removed.
    pub fn invalidate(&mut self, key: &str) -> bool {
        let removed_entry = self.entries.remove(key).is_some();
        let detached = self.inflight.remove(key).is_some();

        if removed_entry {
            self.stats.record_invalidations(1);
        }
        if removed_entry || detached {
            debug!(key, detached, "cache key invalidated");
        }
        removed_entry || detached
    }

    // == Invalidate Matching ==
    /// Invalidates every key matching `pattern`. Returns the number of
    /// entries removed.
    pub fn invalidate_matching(&mut self, pattern: &Regex) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !pattern.is_match(key));
        self.inflight.retain(|key, _| !pattern.is_match(key));

        let removed = before - self.entries.len();
        self.stats.record_invalidations(removed);
        removed
    }

    // == Clear ==
    /// Drops every entry and detaches every in-flight fetch.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.inflight.clear();
        self.stats.record_invalidations(removed);
    }

    // == Cleanup ==
    /// Removes all expired entries. Fresh entries and in-flight markers are
    /// left alone.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh_at(now));

        let removed = before - self.entries.len();
        self.stats.record_expirations(removed);
        removed
    }

    // == In-flight Markers ==
    /// Records `fetch` as the running producer call for `key`.
    pub fn mark_inflight(&mut self, key: String, fetch: InflightFetch) {
        self.stats.record_fetch();
        self.inflight.insert(key, fetch);
    }

    /// Clears the marker for `key` if it still belongs to `fetch_id`.
    ///
    /// A marker that was detached and replaced by a newer fetch is left in
    /// place. Returns true if the marker was cleared.
    pub fn clear_inflight(&mut self, key: &str, fetch_id: u64) -> bool {
        match self.inflight.get(key) {
            Some(fetch) if fetch.id == fetch_id => {
                self.inflight.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Returns the running fetch for `key`, if any.
    pub fn inflight(&self, key: &str) -> Option<&InflightFetch> {
        self.inflight.get(key)
    }

    /// Attaches a caller to the running fetch for `key`, if any.
    pub fn join_inflight(&mut self, key: &str) -> Option<PendingFetch> {
        let pending = self.inflight.get(key)?.pending.clone();
        self.stats.record_join();
        Some(pending)
    }

    // == Complete Fetch ==
    /// Settles producer call `fetch_id` for `key`.
    ///
    /// The value is stored only when the call still owns the key's marker;
    /// failures never populate the store. Returns true if a value was stored.
    pub fn complete_fetch(
        &mut self,
        key: &str,
        fetch_id: u64,
        outcome: &FetchOutcome,
        ttl: Duration,
    ) -> bool {
        let owned = self.clear_inflight(key, fetch_id);

        match outcome {
            Ok(value) if owned => {
                self.set(key.to_string(), Arc::clone(value), ttl);
                true
            }
            Ok(_) => {
                debug!(key, fetch_id, "discarding result of detached fetch");
                false
            }
            Err(_) => {
                self.stats.record_fetch_failure();
                false
            }
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_sizes(self.entries.len(), self.inflight.len());
        stats
    }

    /// Returns how long the entry for `key` stays fresh, or `None` if there
    /// is no fresh entry. Does not count as a lookup.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh_at(now))
            .map(|entry| entry.ttl_remaining_at(now))
    }

    /// Returns the keys of all stored entries, fresh or not.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    // == Length ==
    /// Returns the current number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of fetches currently in flight.
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::build_key;
    use crate::error::CacheError;
    use futures::future::{self, FutureExt};
    use std::any::Any;

    const FIVE_MINUTES: Duration = Duration::from_millis(300_000);

    fn cached<T: Any + Send + Sync>(value: T) -> CachedValue {
        Arc::new(value)
    }

    /// Reads `key` back as a `T`.
    fn read<T: Any + Clone>(store: &mut CacheStore, key: &str) -> Option<T> {
        store.get(key).and_then(|value| value.downcast_ref::<T>().cloned())
    }

    fn pending_marker(id: u64) -> InflightFetch {
        let pending: PendingFetch = future::pending::<FetchOutcome>().boxed().shared();
        InflightFetch::new(id, pending)
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.inflight_len(), 0);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), cached("value1"), FIVE_MINUTES);

        assert_eq!(read::<&str>(&mut store, "key1"), Some("value1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = CacheStore::new();
        assert!(store.get("nonexistent").is_none());
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), cached(1), FIVE_MINUTES);
        store.set("key1".to_string(), cached(2), FIVE_MINUTES);

        assert_eq!(read::<i32>(&mut store, "key1"), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_ttl_expiration() {
        let mut store = CacheStore::new();
        let key = build_key("userData", "uid1");

        store.set(key.clone(), cached(30_i64), FIVE_MINUTES);
        assert_eq!(read::<i64>(&mut store, &key), Some(30));

        tokio::time::advance(Duration::from_millis(300_001)).await;

        assert!(store.get(&key).is_none());
        // Expired entry is removed eagerly
        assert!(store.is_empty());
        assert_eq!(store.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_overwrite_resets_age() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), cached(1), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;
        store.set("key1".to_string(), cached(2), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(read::<i32>(&mut store, "key1"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_per_key_ttl() {
        let mut store = CacheStore::new();

        store.set("short".to_string(), cached(1), Duration::from_secs(1));
        store.set("long".to_string(), cached(2), Duration::from_secs(60));
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(store.get("short").is_none());
        assert_eq!(read::<i32>(&mut store, "long"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_ttl_remaining() {
        let mut store = CacheStore::new();
        store.set("key1".to_string(), cached(1), Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(store.ttl_remaining("key1"), Some(Duration::from_secs(6)));
        assert_eq!(store.ttl_remaining("missing"), None);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.ttl_remaining("key1"), None);
        // Not a lookup
        assert_eq!(store.stats().hits + store.stats().misses, 0);
    }

    #[test]
    fn test_store_invalidate() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), cached("value1"), FIVE_MINUTES);
        assert!(store.invalidate("key1"));

        assert!(store.is_empty());
        assert!(store.get("key1").is_none());
        assert_eq!(store.stats().invalidations, 1);
    }

    #[test]
    fn test_store_invalidate_nonexistent() {
        let mut store = CacheStore::new();
        assert!(!store.invalidate("nonexistent"));
        assert!(!store.invalidate("nonexistent"));
        assert_eq!(store.stats().invalidations, 0);
    }

    #[test]
    fn test_store_invalidate_detaches_inflight() {
        let mut store = CacheStore::new();
        store.mark_inflight("key1".to_string(), pending_marker(1));

        assert!(store.invalidate("key1"));
        assert!(store.inflight("key1").is_none());

        // The detached fetch no longer populates the store
        let stored = store.complete_fetch("key1", 1, &Ok(cached("late")), FIVE_MINUTES);
        assert!(!stored);
        assert!(store.get("key1").is_none());
    }

    #[test]
    fn test_store_invalidate_matching() {
        let mut store = CacheStore::new();
        store.set("trustScore:a".to_string(), cached(1), FIVE_MINUTES);
        store.set("trustScore:b".to_string(), cached(2), FIVE_MINUTES);
        store.set("userData:a".to_string(), cached(3), FIVE_MINUTES);

        let pattern = Regex::new("^trustScore:").unwrap();
        assert_eq!(store.invalidate_matching(&pattern), 2);

        assert_eq!(store.keys(), vec!["userData:a".to_string()]);
    }

    #[test]
    fn test_store_clear() {
        let mut store = CacheStore::new();
        store.set("a".to_string(), cached(1), FIVE_MINUTES);
        store.set("b".to_string(), cached(2), FIVE_MINUTES);
        store.mark_inflight("c".to_string(), pending_marker(1));

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.inflight_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_cleanup_expired() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), cached("value1"), Duration::from_secs(1));
        store.set("key2".to_string(), cached("value2"), Duration::from_secs(10));
        store.mark_inflight("key3".to_string(), pending_marker(7));

        tokio::time::advance(Duration::from_millis(1100)).await;

        let removed = store.cleanup();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(read::<&str>(&mut store, "key2"), Some("value2"));
        assert_eq!(store.inflight("key3").map(|f| f.id), Some(7));
    }

    #[test]
    fn test_store_cleanup_on_fresh_store_is_noop() {
        let mut store = CacheStore::new();
        store.set("key1".to_string(), cached(1), FIVE_MINUTES);

        assert_eq!(store.cleanup(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_inflight_requires_matching_id() {
        let mut store = CacheStore::new();
        store.mark_inflight("key1".to_string(), pending_marker(2));

        assert!(!store.clear_inflight("key1", 1));
        assert!(store.inflight("key1").is_some());

        assert!(store.clear_inflight("key1", 2));
        assert!(store.inflight("key1").is_none());
    }

    #[test]
    fn test_join_inflight_counts_deduplicated_callers() {
        let mut store = CacheStore::new();
        assert!(store.join_inflight("key1").is_none());

        store.mark_inflight("key1".to_string(), pending_marker(1));
        assert!(store.join_inflight("key1").is_some());
        assert!(store.join_inflight("key1").is_some());

        let stats = store.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.deduplicated, 2);
        assert_eq!(stats.inflight, 1);
    }

    #[test]
    fn test_complete_fetch_success_populates() {
        let mut store = CacheStore::new();
        store.mark_inflight("key1".to_string(), pending_marker(1));

        assert!(store.complete_fetch("key1", 1, &Ok(cached(42)), FIVE_MINUTES));

        assert_eq!(store.inflight_len(), 0);
        assert_eq!(read::<i32>(&mut store, "key1"), Some(42));
    }

    #[test]
    fn test_complete_fetch_failure_does_not_populate() {
        let mut store = CacheStore::new();
        store.mark_inflight("key1".to_string(), pending_marker(1));

        let outcome: FetchOutcome = Err(CacheError::fetch(anyhow::anyhow!("offline")));
        assert!(!store.complete_fetch("key1", 1, &outcome, FIVE_MINUTES));

        assert_eq!(store.inflight_len(), 0);
        assert!(store.get("key1").is_none());
        assert_eq!(store.stats().fetch_failures, 1);
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new();

        store.set("key1".to_string(), cached("value1"), FIVE_MINUTES);
        store.get("key1"); // hit
        store.get("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }
}
