//! Cache Module
//!
//! Provides an in-memory read-through cache with TTL expiration, explicit
//! invalidation and single-flight fetches.

mod accessor;
mod entry;
mod inflight;
mod key;
mod stats;
mod store;


use std::time::Duration;

// Re-export public types
pub use accessor::FetchCache;
pub use entry::CacheEntry;
pub use inflight::{CachedValue, FetchOutcome, InflightFetch, PendingFetch};
pub use key::{build_key, category_pattern, CacheCategory, KEY_SEPARATOR};
pub use stats::{CacheSnapshot, CacheStats};
pub use store::CacheStore;

// == Public Constants ==
/// TTL used when a caller does not choose one (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_millis(5 * 60 * 1000);
