//! Foreground Cleanup Task
//!
//! Runs an opportunistic cleanup each time the application comes back to
//! the foreground. The host application publishes visibility changes on a
//! `watch` channel.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::FetchCache;

/// Whether the host application is currently visible to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppVisibility {
    #[default]
    Foreground,
    Background,
}

/// Spawns a task that calls [`FetchCache::cleanup`] whenever `visibility`
/// changes to [`AppVisibility::Foreground`].
///
/// The task exits once every sender for the channel has been dropped.
pub fn spawn_foreground_cleanup(
    cache: FetchCache,
    mut visibility: watch::Receiver<AppVisibility>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        visibility.borrow_and_update();

        while visibility.changed().await.is_ok() {
            let next = *visibility.borrow_and_update();

            if next == AppVisibility::Foreground {
                let removed = cache.cleanup();
                info!(removed, "App returned to foreground, expired entries purged");
            } else {
                debug!(?next, "App visibility changed");
            }
        }

        debug!("Visibility channel closed, foreground cleanup stopped");
    })
}
