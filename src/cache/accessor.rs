//! Read-Through Accessor
//!
//! [`FetchCache`] is the shared handle the rest of the application talks
//! to. It answers from the store while an entry is fresh and otherwise runs
//! the caller's producer, making sure concurrent callers for the same key
//! share a single producer call.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, warn};

use crate::cache::{
    CacheSnapshot, CacheStats, CacheStore, CachedValue, FetchOutcome, InflightFetch,
    PendingFetch, DEFAULT_TTL,
};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Fetch Cache ==
/// Cloneable handle to a process-wide read-through cache.
#[derive(Clone)]
pub struct FetchCache {
    /// Shared store; the lock is never held across an await point
    store: Arc<Mutex<CacheStore>>,
    /// Source of producer-call ids
    next_fetch_id: Arc<AtomicU64>,
    /// TTL applied by callers that do not pick their own
    default_ttl: Duration,
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl FetchCache {
    // == Constructors ==
    /// Creates an empty cache with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            store: Arc::new(Mutex::new(CacheStore::new())),
            next_fetch_id: Arc::new(AtomicU64::new(1)),
            default_ttl,
        }
    }

    /// Creates an empty cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_ttl())
    }

    /// Returns the TTL used when callers do not supply one.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == With Cache ==
    /// Returns the cached value for `key`, or runs `producer` to fetch it.
    ///
    /// While a producer call is running for `key`, later callers wait on
    /// that call instead of starting another, and all of them receive the
    /// same value or the same error. A failed fetch is not cached.
    ///
    /// The producer runs on its own task: dropping the returned future does
    /// not cancel the fetch, whose result still lands in the cache.
    ///
    /// The value is stored as the producer returned it and every caller gets
    /// a clone. Asking for a different `T` than the one stored under `key`
    /// is a [`CacheError::TypeMismatch`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the producer is
    /// started with [`tokio::spawn`].
    pub async fn with_cache<T, F, Fut>(&self, key: &str, producer: F, ttl: Duration) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let pending = {
            let mut store = self.store.lock();

            if let Some(value) = store.get(key) {
                debug!(key, "cache hit");
                return downcast(key, value);
            }

            match store.join_inflight(key) {
                Some(pending) => {
                    debug!(key, "joining in-flight fetch");
                    pending
                }
                None => {
                    let fetch_id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let pending = self.spawn_fetch(key, fetch_id, producer, ttl);
                    // Registered before the lock is released, so the next
                    // caller for this key sees it
                    store.mark_inflight(key.to_string(), InflightFetch::new(fetch_id, pending.clone()));
                    debug!(key, fetch_id, "cache miss, fetching");
                    pending
                }
            }
        };

        let value = pending.await?;
        downcast(key, value)
    }

    /// [`with_cache`](Self::with_cache) using the cache's default TTL.
    pub async fn with_default_ttl<T, F, Fut>(&self, key: &str, producer: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.with_cache(key, producer, self.default_ttl).await
    }

    /// Spawns the producer call and returns a shareable handle to it.
    fn spawn_fetch<T, F, Fut>(&self, key: &str, fetch_id: u64, producer: F, ttl: Duration) -> PendingFetch
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task_key = key.to_string();

        let task = tokio::spawn(async move {
            let key = task_key;
            let result = AssertUnwindSafe(async move { producer().await }).catch_unwind().await;

            let outcome: FetchOutcome = match result {
                Ok(Ok(value)) => Ok(Arc::new(value) as CachedValue),
                Ok(Err(err)) => Err(CacheError::fetch(err)),
                Err(panic) => Err(CacheError::FetchPanicked {
                    key: key.clone(),
                    message: panic_message(panic),
                }),
            };

            if let Err(err) = &outcome {
                warn!(key = %key, fetch_id, error = %err, "fetch failed");
            }

            store.lock().complete_fetch(&key, fetch_id, &outcome, ttl);
            outcome
        });

        let key = key.to_string();
        let store = Arc::clone(&self.store);
        task.map(move |joined| {
            joined.unwrap_or_else(|err| {
                // The task never reached its own bookkeeping
                let outcome: FetchOutcome = Err(CacheError::FetchAborted {
                    key: key.clone(),
                    message: err.to_string(),
                });
                store.lock().complete_fetch(&key, fetch_id, &outcome, ttl);
                outcome
            })
        })
        .boxed()
        .shared()
    }

    // == Direct Access ==
    /// Returns the fresh cached value for `key`, if any.
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Result<Option<T>> {
        let value = self.store.lock().get(key);
        value.map(|value| downcast(key, value)).transpose()
    }

    /// Stores `value` under `key` for `ttl`.
    pub fn set<T: Send + Sync + 'static>(&self, key: &str, value: T, ttl: Duration) {
        self.store.lock().set(key.to_string(), Arc::new(value), ttl);
    }

    /// Returns how long `key` stays fresh, or `None` without a fresh entry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.store.lock().ttl_remaining(key)
    }

    /// Removes `key`; the next read is a miss.
    pub fn invalidate(&self, key: &str) {
        self.store.lock().invalidate(key);
    }

    /// Removes every key matching `pattern`. Returns how many entries went.
    pub fn invalidate_matching(&self, pattern: &Regex) -> usize {
        self.store.lock().invalidate_matching(pattern)
    }

    /// Drops everything in the cache.
    pub fn clear(&self) {
        self.store.lock().clear();
    }

    /// Purges expired entries. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.store.lock().cleanup()
    }

    // == Introspection ==
    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    /// Returns current statistics together with the stored keys.
    pub fn snapshot(&self) -> CacheSnapshot {
        let store = self.store.lock();
        CacheSnapshot::new(store.stats(), store.keys())
    }

    /// Returns true if a fetch is currently running for `key`.
    pub fn is_fetching(&self, key: &str) -> bool {
        self.store.lock().inflight(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}

fn downcast<T: Clone + 'static>(key: &str, value: CachedValue) -> Result<T> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| CacheError::type_mismatch::<T>(key))
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
