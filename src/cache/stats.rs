//! Cache Statistics Module
//!
//! Tracks cache effectiveness: hits, misses, producer calls and how many
//! callers were folded into an already running fetch.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered with a fresh value
    pub hits: u64,
    /// Lookups that found nothing fresh
    pub misses: u64,
    /// Producer invocations started
    pub fetches: u64,
    /// Callers that joined an in-flight fetch instead of starting one
    pub deduplicated: u64,
    /// Producer invocations that failed or panicked
    pub fetch_failures: u64,
    /// Entries removed by explicit invalidation
    pub invalidations: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Current number of stored entries
    pub total_entries: usize,
    /// Current number of in-flight fetches
    pub inflight: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_join(&mut self) {
        self.deduplicated += 1;
    }

    pub fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }

    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    // == Update Gauges ==
    /// Updates the entry and in-flight gauges.
    pub fn set_sizes(&mut self, total_entries: usize, inflight: usize) {
        self.total_entries = total_entries;
        self.inflight = inflight;
    }
}

// == Cache Snapshot ==
/// Point-in-time view of the cache for debugging.
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Counters at that moment
    pub stats: CacheStats,
    /// Keys currently stored, sorted
    pub keys: Vec<String>,
}

impl CacheSnapshot {
    pub fn new(stats: CacheStats, mut keys: Vec<String>) -> Self {
        keys.sort();
        Self {
            taken_at: Utc::now(),
            stats,
            keys,
        }
    }
}
