//! User Data Module
//!
//! Loads a user's trust score and titles through the shared cache, so that
//! every part of the application asking for the same user at once results
//! in a single backend read.

mod source;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheCategory, FetchCache};
use crate::error::Result;

pub use source::{InMemoryUserSource, UserDocument, UserDocumentSource};

/// Trust score assumed for users without a recorded one.
pub const DEFAULT_TRUST_SCORE: f64 = 30.0;

// == User Data ==
/// The per-user bundle shared by the trust-score and title features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub trust_score: f64,
    pub owned_titles: Vec<String>,
    /// `None` when the user never picked a title
    pub current_title: Option<String>,
}

impl Default for UserData {
    fn default() -> Self {
        Self {
            trust_score: DEFAULT_TRUST_SCORE,
            owned_titles: Vec::new(),
            current_title: None,
        }
    }
}

impl UserData {
    /// Extracts the bundle from a raw document, tolerating missing or
    /// mistyped fields.
    pub fn from_document(document: &UserDocument) -> Self {
        let trust_score = document
            .get("trustScore")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_TRUST_SCORE);

        let owned_titles = document
            .get("ownedTitles")
            .and_then(Value::as_array)
            .map(|titles| {
                titles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        // A blank title is treated the same as no title
        let current_title = document
            .get("currentTitle")
            .and_then(Value::as_str)
            .filter(|title| !title.trim().is_empty())
            .map(str::to_string);

        Self {
            trust_score,
            owned_titles,
            current_title,
        }
    }
}

// == User Data Loader ==
/// Cached access to user documents.
#[derive(Clone)]
pub struct UserDataLoader {
    cache: FetchCache,
    source: Arc<dyn UserDocumentSource>,
}

impl UserDataLoader {
    pub fn new(cache: FetchCache, source: Arc<dyn UserDocumentSource>) -> Self {
        Self { cache, source }
    }

    /// Returns the user's bundle, reading the backend only on a cache miss.
    ///
    /// A user without a document gets [`UserData::default`].
    pub async fn load(&self, uid: &str) -> Result<UserData> {
        let source = Arc::clone(&self.source);
        let owned_uid = uid.to_string();

        self.cache
            .with_default_ttl(&CacheCategory::UserData.key(uid), move || async move {
                let document = source.fetch_user(&owned_uid).await?;
                anyhow::Ok(
                    document
                        .as_ref()
                        .map(UserData::from_document)
                        .unwrap_or_default(),
                )
            })
            .await
    }

    /// Returns only the user's trust score.
    pub async fn trust_score(&self, uid: &str) -> Result<f64> {
        Ok(self.load(uid).await?.trust_score)
    }

    /// Writes `fields` to the user's document, then drops every cached view
    /// of that user so the next read sees the change.
    pub async fn update(&self, uid: &str, fields: UserDocument) -> anyhow::Result<()> {
        self.source.update_user(uid, fields).await?;
        self.invalidate(uid);
        Ok(())
    }

    /// Drops every cached entry belonging to `uid`.
    pub fn invalidate(&self, uid: &str) {
        for category in CacheCategory::ALL {
            self.cache.invalidate(&category.key(uid));
        }
        debug!(uid, "user cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> UserDocument {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_document_full() {
        let data = UserData::from_document(&doc(json!({
            "trustScore": 72,
            "ownedTitles": ["newcomer", "helper"],
            "currentTitle": "helper",
        })));

        assert_eq!(data.trust_score, 72.0);
        assert_eq!(data.owned_titles, vec!["newcomer", "helper"]);
        assert_eq!(data.current_title.as_deref(), Some("helper"));
    }

    #[test]
    fn test_from_document_defaults() {
        let data = UserData::from_document(&UserDocument::new());
        assert_eq!(data, UserData::default());
        assert_eq!(data.trust_score, DEFAULT_TRUST_SCORE);
    }

    #[test]
    fn test_from_document_ignores_bad_fields() {
        let data = UserData::from_document(&doc(json!({
            "trustScore": "high",
            "ownedTitles": ["ok", 3, null, "fine"],
            "currentTitle": "   ",
        })));

        assert_eq!(data.trust_score, DEFAULT_TRUST_SCORE);
        assert_eq!(data.owned_titles, vec!["ok", "fine"]);
        assert_eq!(data.current_title, None);
    }

    #[test]
    fn test_from_document_fractional_score() {
        let data = UserData::from_document(&doc(json!({"trustScore": 41.5})));
        assert_eq!(data.trust_score, 41.5);
    }

    #[test]
    fn test_user_data_serializes_camel_case() {
        let json = serde_json::to_value(UserData::default()).unwrap();
        assert_eq!(
            json,
            json!({"trustScore": 30.0, "ownedTitles": [], "currentTitle": null})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_drops_every_user_key() {
        let cache = FetchCache::default();
        let loader = UserDataLoader::new(cache.clone(), Arc::new(InMemoryUserSource::default()));
        for category in CacheCategory::ALL {
            cache.set(&category.key("uid1"), 1, cache.default_ttl());
        }
        cache.set(&CacheCategory::UserData.key("uid2"), 2, cache.default_ttl());

        loader.invalidate("uid1");

        assert_eq!(cache.snapshot().keys, vec!["userData:uid2".to_string()]);
    }
}
