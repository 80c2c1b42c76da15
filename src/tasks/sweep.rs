//! Expiry Sweep Task
//!
//! Background task that repeatedly removes expired cache entries until it is
//! told to stop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedState;

/// Spawns the background task that evicts expired entries.
///
/// Each cycle locks the shared state, pops every expired entry off the
/// expiry queue, releases the lock and then idles for `interval`. The idle
/// wait races against `shutdown`, so a stop signal (or the sender being
/// dropped) ends the task without waiting out the interval. The returned
/// handle completes once the loop has exited, which is the acknowledgment
/// `Cache::close` waits for.
///
/// # Arguments
/// * `state` - Shared cache state, locked once per cycle
/// * `interval` - Idle wait between cycles
/// * `shutdown` - Stop signal
pub(crate) fn spawn_sweep_task<V>(
    state: Arc<Mutex<SharedState<V>>>,
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!("Starting expiry sweep task with interval of {:?}", interval);

        loop {
            let removed = {
                let mut guard = state.lock().await;
                guard.store.sweep_expired()
            };

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => break,
            }
        }

        info!("Expiry sweep task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStatus, CacheStore};

    fn shared_state(default_ttl: Duration) -> Arc<Mutex<SharedState<String>>> {
        Arc::new(Mutex::new(SharedState {
            store: CacheStore::new(100, Some(default_ttl)),
            status: CacheStatus::Running,
        }))
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let state = shared_state(Duration::from_secs(300));

        state
            .lock()
            .await
            .store
            .set("expire_soon".to_string(), "value".to_string(), Some(Duration::from_millis(100)))
            .unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = spawn_sweep_task(state.clone(), Duration::from_millis(50), shutdown_rx);

        tokio::time::sleep(Duration::from_millis(400)).await;

        {
            let guard = state.lock().await;
            assert!(guard.store.is_empty(), "Expired entry should have been swept");
            assert_eq!(guard.store.stats().expirations, 1);
        }

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let state = shared_state(Duration::from_secs(3600));

        state
            .lock()
            .await
            .store
            .set("long_lived".to_string(), "value".to_string(), None)
            .unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = spawn_sweep_task(state.clone(), Duration::from_millis(50), shutdown_rx);

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(
            state.lock().await.store.get("long_lived"),
            Some("value".to_string())
        );

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_task_stops_on_signal_during_idle_wait() {
        let state = shared_state(Duration::from_secs(300));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // Interval far longer than the test: only the signal can end the wait
        let handle = spawn_sweep_task(state, Duration::from_secs(3600), shutdown_rx);
        tokio::time::sleep(Duration::from_millis(50)).await;

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("Sweep task should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_task_stops_when_sender_dropped() {
        let state = shared_state(Duration::from_secs(300));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = spawn_sweep_task(state, Duration::from_secs(3600), shutdown_rx);
        drop(shutdown_tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("Sweep task should stop once the sender is gone")
            .unwrap();
    }
}
