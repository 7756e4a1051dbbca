//! Error types for the fetch cache
//!
//! Provides unified error handling using thiserror.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the fetch cache.
///
/// Errors are `Clone` because a single fetch outcome is handed to every
/// caller waiting on the same key.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The producer failed. All waiters share the same underlying error.
    #[error(transparent)]
    Fetch(Arc<dyn StdError + Send + Sync + 'static>),

    /// The producer panicked while fetching
    #[error("Fetch for '{key}' panicked: {message}")]
    FetchPanicked { key: String, message: String },

    /// The fetch task was cancelled before it finished
    #[error("Fetch for '{key}' was aborted: {message}")]
    FetchAborted { key: String, message: String },

    /// The value cached under `key` is of a different type than requested
    #[error("Cached value for '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

impl CacheError {
    /// Wraps a producer failure so it can be shared between waiters.
    pub fn fetch(err: anyhow::Error) -> Self {
        let boxed: Box<dyn StdError + Send + Sync + 'static> = err.into();
        CacheError::Fetch(Arc::from(boxed))
    }

    pub(crate) fn type_mismatch<T>(key: &str) -> Self {
        CacheError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the fetch cache.
pub type Result<T> = std::result::Result<T, CacheError>;
