//! Configuration Module
//!
//! Handles loading cache and demo configuration from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in milliseconds for callers that do not pick one
    pub default_ttl_ms: u64,
    /// Background cleanup task interval in milliseconds
    pub cleanup_interval_ms: u64,
    /// Simulated backend latency used by the demo document source
    pub fetch_latency_ms: u64,
    /// Number of simultaneous callers in the demo burst
    pub concurrent_callers: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CLEANUP_INTERVAL_MS` - Cleanup frequency in milliseconds (default: 300000)
    /// - `FETCH_LATENCY_MS` - Simulated fetch latency (default: 50)
    /// - `CONCURRENT_CALLERS` - Demo burst size (default: 8)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl_ms: env_or("DEFAULT_TTL_MS", defaults.default_ttl_ms),
            cleanup_interval_ms: env_or("CLEANUP_INTERVAL_MS", defaults.cleanup_interval_ms),
            fetch_latency_ms: env_or("FETCH_LATENCY_MS", defaults.fetch_latency_ms),
            concurrent_callers: env_or("CONCURRENT_CALLERS", defaults.concurrent_callers),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn fetch_latency(&self) -> Duration {
        Duration::from_millis(self.fetch_latency_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl_ms: 300_000,
            cleanup_interval_ms: 300_000,
            fetch_latency_ms: 50,
            concurrent_callers: 8,
        }
    }
}

/// Reads and parses `name`, falling back to `default` when unset or invalid.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
