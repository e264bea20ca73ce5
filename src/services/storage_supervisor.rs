use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{score_store::ScoreStore, storage::StorageError},
    state::StoreSlot,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Keep a score store installed in `slot`, reconnecting with exponential
/// backoff and flagging degraded mode while it is unreachable.
pub async fn run<F, Fut>(slot: Arc<StoreSlot>, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn ScoreStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                slot.install(store.clone()).await;
                info!("score store connected; leaving degraded mode");
                delay = INITIAL_DELAY;

                watch_store(&slot, store.as_ref()).await;
                slot.clear().await;
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "score store connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Poll the store until it fails and cannot be revived in place.
async fn watch_store(slot: &StoreSlot, store: &dyn ScoreStore) {
    loop {
        if store.health_check().await.is_ok() {
            if slot.is_degraded() {
                info!("score store healthy again; leaving degraded mode");
                slot.set_degraded(false);
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        let mut reconnect_delay = INITIAL_DELAY;
        let mut reconnected = false;
        for attempt in 0..MAX_RECONNECT_ATTEMPTS {
            match store.try_reconnect().await {
                Ok(()) => {
                    info!(attempt, "score store reconnected after failed health check");
                    reconnected = true;
                    break;
                }
                Err(err) => {
                    if attempt == 0 {
                        warn!(attempt, error = %err, "score store reconnect failed; entering degraded mode");
                        slot.set_degraded(true);
                    } else {
                        warn!(attempt, error = %err, "score store reconnect attempt failed");
                    }
                    sleep(reconnect_delay).await;
                    reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                }
            }
        }

        if !reconnected {
            warn!("exhausted score store reconnect attempts; staying in degraded mode");
            return;
        }
        slot.set_degraded(false);
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::dao::score_store::MemoryScoreStore;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    #[tokio::test(start_paused = true)]
    async fn installs_store_after_failed_attempts() {
        let slot = Arc::new(StoreSlot::new());
        let attempts = Arc::new(AtomicU32::new(0));

        let counter = attempts.clone();
        let supervisor = tokio::spawn(run(slot.clone(), move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(StorageError::unavailable("test".into(), Refused))
                } else {
                    Ok(Arc::new(MemoryScoreStore::new()) as Arc<dyn ScoreStore>)
                }
            }
        }));

        let mut degraded = slot.degraded_watcher();
        assert!(*degraded.borrow());
        degraded.changed().await.unwrap();

        assert!(!slot.is_degraded());
        assert!(slot.get().await.is_some());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        supervisor.abort();
    }
}
