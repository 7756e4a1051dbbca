//! In-flight Fetch Module
//!
//! Shared handle to a producer call that several callers can await.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};

use crate::error::CacheError;

/// Stored payload, exactly as the producer returned it.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Result of a single producer call as seen by every waiter.
pub type FetchOutcome = Result<CachedValue, CacheError>;

/// Pending producer result, cloneable so each waiter gets its own handle.
pub type PendingFetch = Shared<BoxFuture<'static, FetchOutcome>>;

// == In-flight Fetch ==
/// Marker recorded for a key while its producer is running.
#[derive(Clone)]
pub struct InflightFetch {
    /// Identifies the producer call that owns this marker
    pub id: u64,
    /// Handle resolving to the producer's outcome
    pub pending: PendingFetch,
}

impl InflightFetch {
    pub fn new(id: u64, pending: PendingFetch) -> Self {
        Self { id, pending }
    }
}

impl fmt::Debug for InflightFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InflightFetch")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
