//! User Document Sources
//!
//! The backend boundary the loader reads user documents from and writes
//! profile changes to.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};

/// Raw user document as stored by the backend.
pub type UserDocument = Map<String, Value>;

// == Source Trait ==
/// Backend holding one document per user.
#[async_trait]
pub trait UserDocumentSource: Send + Sync {
    /// Reads the document for `uid`, `None` if it does not exist.
    async fn fetch_user(&self, uid: &str) -> anyhow::Result<Option<UserDocument>>;

    /// Merges `fields` into the document for `uid`, creating it if needed.
    async fn update_user(&self, uid: &str, fields: UserDocument) -> anyhow::Result<()>;
}

// == In-Memory Source ==
/// Document source kept in memory, with simulated latency.
#[derive(Debug, Default)]
pub struct InMemoryUserSource {
    documents: RwLock<HashMap<String, UserDocument>>,
    latency: Duration,
    fetches: AtomicUsize,
    offline: AtomicBool,
}

impl InMemoryUserSource {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Inserts or replaces the document for `uid`.
    pub fn insert(&self, uid: impl Into<String>, document: UserDocument) {
        self.documents.write().insert(uid.into(), document);
    }

    /// Number of `fetch_user` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("user document source is offline");
        }
        Ok(())
    }
}

#[async_trait]
impl UserDocumentSource for InMemoryUserSource {
    async fn fetch_user(&self, uid: &str) -> anyhow::Result<Option<UserDocument>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.ensure_online()?;

        Ok(self.documents.read().get(uid).cloned())
    }

    async fn update_user(&self, uid: &str, fields: UserDocument) -> anyhow::Result<()> {
        tokio::time::sleep(self.latency).await;
        self.ensure_online()?;

        let mut documents = self.documents.write();
        documents.entry(uid.to_string()).or_default().extend(fields);
        Ok(())
    }
}
