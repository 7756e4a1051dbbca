//! Fetch Cache - an in-memory read-through cache
//!
//! Sits in front of slow backend reads with TTL expiration, explicit
//! invalidation and single-flight fetches for concurrent callers.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;
pub mod users;

pub use cache::{build_key, CacheCategory, FetchCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{spawn_cleanup_task, spawn_foreground_cleanup, AppVisibility};
