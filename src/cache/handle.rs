//! Cache Handle Module
//!
//! The concurrent cache: a [`CacheStore`] behind one mutex, the background
//! expiry sweep, and the close handshake.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cache::{CacheStats, CacheStore};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::snapshot::{JsonFileSink, Snapshot, SnapshotSink};
use crate::tasks::spawn_sweep_task;

// == Cache Status ==
/// Lifecycle state of a [`Cache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheStatus {
    /// Sweep active, all operations accepted
    Running,
    /// Stop signal sent, waiting for the sweep to exit
    Closing,
    /// Sweep stopped, snapshot written, operations rejected
    Closed,
}

/// Everything guarded by the cache lock.
#[derive(Debug)]
pub(crate) struct SharedState<V> {
    pub(crate) store: CacheStore<V>,
    pub(crate) status: CacheStatus,
}

/// Stop signal and join handle of a running sweep task.
struct SweepHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

// == Cache ==
/// In-process key/value cache with expiring entries.
///
/// Every successful [`get`](Cache::get) extends the entry's expiry by its TTL
/// (sliding TTL). A background task removes entries once their expiry has
/// passed; the cache must be closed with [`close`](Cache::close) to stop it
/// and write the optional snapshot. Dropping a cache without closing it
/// stops the sweep but skips the snapshot.
pub struct Cache<V> {
    name: String,
    state: Arc<Mutex<SharedState<V>>>,
    sweep: Mutex<Option<SweepHandle>>,
    sink: Option<Arc<dyn SnapshotSink<V>>>,
}

impl<V> Cache<V>
where
    V: Clone + Serialize + Send + 'static,
{
    // == Constructor ==
    /// Creates a cache with the default configuration and starts its sweep.
    ///
    /// # Arguments
    /// * `name` - Cache name, used as the snapshot file stem
    /// * `max_entries` - Capacity bound, 0 = unbounded
    /// * `persist_on_close` - Write `<name>.json` when the cache is closed
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn new(name: impl Into<String>, max_entries: usize, persist_on_close: bool) -> Self {
        Self::with_config(
            CacheConfig::default()
                .with_name(name)
                .with_max_entries(max_entries)
                .with_persist_on_close(persist_on_close),
        )
    }

    /// Creates a cache from a full configuration and starts its sweep.
    ///
    /// When `persist_on_close` is set the snapshot goes to a [`JsonFileSink`]
    /// at [`CacheConfig::snapshot_path`].
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn with_config(config: CacheConfig) -> Self {
        let sink: Option<Arc<dyn SnapshotSink<V>>> = if config.persist_on_close {
            Some(Arc::new(JsonFileSink::new(config.snapshot_path())) as Arc<dyn SnapshotSink<V>>)
        } else {
            None
        };
        Self::start(config, sink)
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + 'static,
{
    /// Creates a cache that writes its snapshot to `sink` on close,
    /// regardless of `config.persist_on_close`.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn with_sink(config: CacheConfig, sink: Arc<dyn SnapshotSink<V>>) -> Self {
        Self::start(config, Some(sink))
    }

    fn start(config: CacheConfig, sink: Option<Arc<dyn SnapshotSink<V>>>) -> Self {
        let state = Arc::new(Mutex::new(SharedState {
            store: CacheStore::new(config.max_entries, config.default_ttl),
            status: CacheStatus::Running,
        }));

        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = spawn_sweep_task(state.clone(), config.sweep_interval, shutdown_rx);

        info!(
            cache = %config.name,
            max_entries = config.max_entries,
            "Cache started"
        );

        Self {
            name: config.name,
            state,
            sweep: Mutex::new(Some(SweepHandle { shutdown, task })),
            sink,
        }
    }

    // == Set ==
    /// Stores a value under `key`.
    ///
    /// # Arguments
    /// * `key` - Non-empty key of at most 256 bytes
    /// * `value` - The value to store
    /// * `ttl` - Explicit TTL, or None for the cache default
    ///
    /// # Errors
    /// `InvalidKey` for an empty or overlong key, `Closed` once closing began.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> Result<()> {
        let mut state = self.state.lock().await;
        self.ensure_running(&state)?;
        state.store.set(key.into(), value, ttl)
    }

    // == Get ==
    /// Returns the value under `key` and refreshes its expiry.
    ///
    /// `Ok(None)` means the key is absent or already expired.
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        let mut state = self.state.lock().await;
        self.ensure_running(&state)?;
        Ok(state.store.get(key))
    }

    // == Delete ==
    /// Removes `key`, returning whether it was present.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        self.ensure_running(&state)?;
        Ok(state.store.delete(key))
    }

    // == Default TTL ==
    /// Changes the TTL used by sets and refreshes without an explicit one.
    ///
    /// Existing expiries are not rewritten.
    pub async fn set_default_ttl(&self, ttl: Option<Duration>) -> Result<()> {
        let mut state = self.state.lock().await;
        self.ensure_running(&state)?;
        state.store.set_default_ttl(ttl);
        Ok(())
    }

    // == Close ==
    /// Stops the sweep task and writes the snapshot, if one is configured.
    ///
    /// Returns only after the sweep task has exited. Snapshot failures are
    /// logged, never returned. Closing an already closed cache does nothing.
    pub async fn close(&self) {
        // Held for the whole close so concurrent callers wait for the first
        let mut sweep = self.sweep.lock().await;
        let Some(SweepHandle { shutdown, task }) = sweep.take() else {
            warn!(cache = %self.name, "Cache already closed");
            return;
        };

        self.state.lock().await.status = CacheStatus::Closing;
        info!(cache = %self.name, "Closing cache");

        // The task may already be gone if it panicked; the join below reports that
        let _ = shutdown.send(());
        if let Err(err) = task.await {
            error!(cache = %self.name, "Sweep task did not exit cleanly: {}", err);
        }

        let entries = {
            let mut state = self.state.lock().await;
            state.status = CacheStatus::Closed;
            self.sink.as_ref().map(|_| state.store.snapshot_entries())
        };
        info!(cache = %self.name, "Cache closed");

        if let (Some(sink), Some(entries)) = (self.sink.clone(), entries) {
            let snapshot = Snapshot::new(self.name.clone(), entries);
            let count = snapshot.entries.len();
            match tokio::task::spawn_blocking(move || sink.write(&snapshot)).await {
                Ok(Ok(())) => info!(cache = %self.name, entries = count, "Snapshot written"),
                Ok(Err(err)) => error!(cache = %self.name, "Failed to write snapshot: {}", err),
                Err(err) => error!(cache = %self.name, "Snapshot writer panicked: {}", err),
            }
        }
    }

    // == Accessors ==
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub async fn status(&self) -> CacheStatus {
        self.state.lock().await.status
    }

    /// Number of entries, available in every state.
    pub async fn len(&self) -> usize {
        self.state.lock().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.store.is_empty()
    }

    /// Current statistics, available in every state.
    pub async fn stats(&self) -> CacheStats {
        self.state.lock().await.store.stats()
    }

    fn ensure_running(&self, state: &SharedState<V>) -> Result<()> {
        match state.status {
            CacheStatus::Running => Ok(()),
            CacheStatus::Closing | CacheStatus::Closed => Err(CacheError::Closed(self.name.clone())),
        }
    }

    #[cfg(test)]
    async fn assert_consistent(&self) {
        self.state.lock().await.store.assert_consistent();
    }
}
