//! Expiry Cache demo
//!
//! Fills a cache, reads the entries back, lets the sweep expire them and
//! closes the cache.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expiry_cache::{Cache, CacheConfig};

const DEMO_ENTRIES: usize = 100;

/// Main entry point for the cache demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache, which starts its sweep task
/// 4. Set and read back `DEMO_ENTRIES` short-lived entries
/// 5. Wait for the sweep to expire them
/// 6. Close the cache, writing a snapshot if configured
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expiry_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: name={}, max_entries={}, default_ttl={:?}, sweep_interval={:?}",
        config.name, config.max_entries, config.default_ttl, config.sweep_interval
    );

    let cache = Cache::with_config(config);

    for i in 0..DEMO_ENTRIES {
        cache
            .set(format!("key-{:04}", i), format!("value-{:04}", i), Some(Duration::from_secs(1)))
            .await
            .context("failed to store demo entry")?;
    }

    let mut found = 0;
    for i in 0..DEMO_ENTRIES {
        if cache.get(&format!("key-{:04}", i)).await?.is_some() {
            found += 1;
        }
    }
    info!("Read back {} of {} entries, {} cached", found, DEMO_ENTRIES, cache.len().await);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    info!("{} entries left after expiry", cache.len().await);

    let stats = cache.stats().await;
    info!("Cache stats: {}", serde_json::to_string(&stats)?);

    cache.close().await;
    Ok(())
}
