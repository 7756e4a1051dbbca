//! Background Tasks Module
//!
//! Housekeeping tasks that keep the cache from holding on to expired
//! entries.
//!
//! # Tasks
//! - TTL Cleanup: purges expired entries at a configured interval
//! - Foreground Cleanup: purges expired entries when the app is resumed

mod cleanup;
mod foreground;

pub use cleanup::spawn_cleanup_task;
pub use foreground::{spawn_foreground_cleanup, AppVisibility};
