//! Fetch Cache demo
//!
//! Simulates several parts of an application asking for the same user at
//! once, then a profile update, and prints the resulting cache snapshot.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fetch_cache::users::{InMemoryUserSource, UserDataLoader, UserDocument};
use fetch_cache::{spawn_cleanup_task, spawn_foreground_cleanup, AppVisibility, Config, FetchCache};

/// Main entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and start the cleanup tasks
/// 4. Fire a burst of concurrent loads for one user
/// 5. Update that user and load again
/// 6. Print cache statistics and stop the background tasks
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fetch_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_ttl={}ms, cleanup_interval={}ms, fetch_latency={}ms, callers={}",
        config.default_ttl_ms,
        config.cleanup_interval_ms,
        config.fetch_latency_ms,
        config.concurrent_callers
    );

    let cache = FetchCache::from_config(&config);
    let cleanup_handle = spawn_cleanup_task(cache.clone(), config.cleanup_interval());
    let (visibility_tx, visibility_rx) = watch::channel(AppVisibility::Foreground);
    let foreground_handle = spawn_foreground_cleanup(cache.clone(), visibility_rx);

    let source = Arc::new(InMemoryUserSource::new(config.fetch_latency()));
    source.insert("uid1", document(json!({
        "trustScore": 42,
        "ownedTitles": ["newcomer", "helper"],
        "currentTitle": "helper",
    })));
    let loader = UserDataLoader::new(cache.clone(), source.clone());

    // Several screens mounting at the same moment
    let burst = (0..config.concurrent_callers).map(|_| {
        let loader = loader.clone();
        tokio::spawn(async move { loader.load("uid1").await })
    });
    for joined in join_all(burst).await {
        let data = joined??;
        info!(trust_score = data.trust_score, "caller received user data");
    }
    info!(
        callers = config.concurrent_callers,
        backend_reads = source.fetch_count(),
        "Burst served"
    );

    loader
        .update("uid1", document(json!({"trustScore": 45})))
        .await?;
    let refreshed = loader.load("uid1").await?;
    info!(
        trust_score = refreshed.trust_score,
        backend_reads = source.fetch_count(),
        "Profile reloaded after update"
    );

    // Round trip through the background, as when the user switches apps
    visibility_tx.send(AppVisibility::Background)?;
    visibility_tx.send(AppVisibility::Foreground)?;

    let snapshot = cache.snapshot();
    info!(
        hit_rate = snapshot.stats.hit_rate(),
        ttl_remaining_ms = cache
            .ttl_remaining("userData:uid1")
            .map(|left| left.as_millis() as u64),
        "Cache state"
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    cleanup_handle.abort();
    drop(visibility_tx);
    foreground_handle.await?;
    info!("Demo complete");

    Ok(())
}

fn document(value: serde_json::Value) -> UserDocument {
    match value {
        serde_json::Value::Object(map) => map,
        _ => UserDocument::new(),
    }
}
