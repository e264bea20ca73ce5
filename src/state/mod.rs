mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::score_store::ScoreStore,
    error::ServiceError,
    gateway::{LeaderboardGateway, StoreGateway},
    services::session_runtime::SessionHandle,
};

pub use self::sse::SseHub;

/// Application state shared across handlers and tasks.
pub type SharedState = Arc<AppState>;

/// Holder for the currently installed score store plus the degraded flag
/// derived from it.
pub struct StoreSlot {
    store: RwLock<Option<Arc<dyn ScoreStore>>>,
    degraded: watch::Sender<bool>,
}

impl Default for StoreSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSlot {
    /// Empty slot; starts degraded until a store is installed.
    pub fn new() -> Self {
        let (degraded, _rx) = watch::channel(true);
        Self {
            store: RwLock::new(None),
            degraded,
        }
    }

    /// Currently installed store, if any.
    pub async fn get(&self) -> Option<Arc<dyn ScoreStore>> {
        self.store.read().await.as_ref().cloned()
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install(&self, store: Arc<dyn ScoreStore>) {
        *self.store.write().await = Some(store);
        self.set_degraded(false);
    }

    /// Drop the current store and enter degraded mode.
    pub async fn clear(&self) {
        self.store.write().await.take();
        self.set_degraded(true);
    }

    /// Toggle degraded mode without touching the installed store, used while
    /// a store is reconnecting.
    pub fn set_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Whether no usable score store is installed.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }
}

/// Central application state: configuration, the score store, the leaderboard
/// gateway and the registry of hosted sessions.
pub struct AppState {
    config: AppConfig,
    store: Arc<StoreSlot>,
    gateway: Arc<dyn LeaderboardGateway>,
    sessions: DashMap<Uuid, SessionHandle>,
}

impl AppState {
    /// State whose sessions submit scores into the local store slot.
    pub fn new(config: AppConfig) -> SharedState {
        let store = Arc::new(StoreSlot::new());
        let gateway = Arc::new(StoreGateway::new(store.clone()));
        Self::with_gateway(config, store, gateway)
    }

    /// State whose sessions submit scores through `gateway`.
    pub fn with_gateway(
        config: AppConfig,
        store: Arc<StoreSlot>,
        gateway: Arc<dyn LeaderboardGateway>,
    ) -> SharedState {
        Arc::new(Self {
            config,
            store,
            gateway,
            sessions: DashMap::new(),
        })
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Slot holding the score store.
    pub fn store(&self) -> &Arc<StoreSlot> {
        &self.store
    }

    /// Installed score store, or [`ServiceError::Degraded`].
    pub async fn require_score_store(&self) -> Result<Arc<dyn ScoreStore>, ServiceError> {
        self.store.get().await.ok_or(ServiceError::Degraded)
    }

    /// Whether no usable score store is installed.
    pub fn is_degraded(&self) -> bool {
        self.store.is_degraded()
    }

    /// Leaderboard hosted sessions submit to.
    pub fn gateway(&self) -> Arc<dyn LeaderboardGateway> {
        self.gateway.clone()
    }

    /// Registry of hosted sessions keyed by their identifier.
    pub fn sessions(&self) -> &DashMap<Uuid, SessionHandle> {
        &self.sessions
    }

    /// Handle of a registered session, or [`ServiceError::NotFound`].
    pub fn session(&self, id: Uuid) -> Result<SessionHandle, ServiceError> {
        self.sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::NotFound(format!("session {id}")))
    }
}
