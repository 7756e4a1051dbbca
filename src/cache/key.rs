//! Cache Key Module
//!
//! Builds namespaced cache keys from a category and a subject identifier.

use std::fmt;

use regex::Regex;

/// Separator placed between a key's category and its subject.
pub const KEY_SEPARATOR: char = ':';

// == Cache Category ==
/// Categories of data cached per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    /// Combined profile bundle (trust score + titles)
    UserData,
    /// Trust score on its own
    TrustScore,
    /// Owned and current titles
    UserTitles,
}

impl CacheCategory {
    /// All per-user categories, in a stable order.
    pub const ALL: [CacheCategory; 3] = [
        CacheCategory::UserData,
        CacheCategory::TrustScore,
        CacheCategory::UserTitles,
    ];

    /// Returns the category prefix used in keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::UserData => "userData",
            CacheCategory::TrustScore => "trustScore",
            CacheCategory::UserTitles => "userTitles",
        }
    }

    /// Builds the key for `subject` in this category.
    pub fn key(&self, subject: &str) -> String {
        build_key(self.as_str(), subject)
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Build Key ==
/// Builds the canonical cache key for a category and subject.
///
/// The category must not contain [`KEY_SEPARATOR`]; under that rule two
/// distinct `(category, subject)` pairs never produce the same key.
pub fn build_key(category: &str, subject: &str) -> String {
    debug_assert!(
        !category.contains(KEY_SEPARATOR),
        "cache category must not contain '{}'",
        KEY_SEPARATOR
    );
    format!("{category}{KEY_SEPARATOR}{subject}")
}

// == Category Pattern ==
/// Returns a pattern matching every key in `category`.
pub fn category_pattern(category: &str) -> Regex {
    let pattern = format!("^{}{}", regex::escape(category), KEY_SEPARATOR);
    Regex::new(&pattern).expect("escaped category is a valid pattern")
}
