//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

use crate::cache::CachedValue;

// == Cache Entry ==
/// Represents a single cache entry with value and freshness metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: CachedValue,
    /// When the entry was last populated
    pub stored_at: Instant,
    /// How long the entry stays fresh after `stored_at`
    pub ttl: Duration,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stored now.
    pub fn new(value: CachedValue, ttl: Duration) -> Self {
        Self::with_stored_at(value, ttl, Instant::now())
    }

    /// Creates a cache entry with an explicit population time.
    pub fn with_stored_at(value: CachedValue, ttl: Duration, stored_at: Instant) -> Self {
        Self {
            value,
            stored_at,
            ttl,
        }
    }

    // == Freshness ==
    /// Checks whether the entry is still fresh at `now`.
    ///
    /// Boundary condition: an entry is fresh only while strictly less than
    /// `ttl` has elapsed since it was stored. Once the full TTL has elapsed
    /// the entry is stale.
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }

    // == Time To Live ==
    /// Returns the freshness window left at `now`, zero once expired.
    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(self.stored_at))
    }
}
