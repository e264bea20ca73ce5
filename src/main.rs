//! memory-match-back binary entrypoint wiring REST, SSE, the score store and
//! the leaderboard gateway.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memory_match_back::{
    config::AppConfig,
    dao::score_store::{MemoryScoreStore, ScoreStore},
    gateway::{LeaderboardGateway, StoreGateway},
    routes,
    state::{AppState, SharedState, StoreSlot},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    config.validate().context("invalid game configuration")?;

    let store = Arc::new(StoreSlot::new());
    start_score_store(store.clone()).await;
    let gateway = leaderboard_gateway(store.clone())?;
    let app_state = AppState::with_gateway(config, store, gateway);

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the CouchDB store under supervision when `COUCH_BASE_URL` is set,
/// the in-memory store otherwise.
async fn start_score_store(slot: Arc<StoreSlot>) {
    #[cfg(feature = "couch-store")]
    {
        use memory_match_back::{
            dao::{
                score_store::couchdb::{CouchConfig, CouchScoreStore},
                storage::StorageError,
            },
            services::storage_supervisor,
        };

        if env::var_os("COUCH_BASE_URL").is_some() {
            match CouchConfig::from_env() {
                Ok(config) => {
                    info!(base_url = %config.base_url, database = %config.database, "using CouchDB score store");
                    tokio::spawn(storage_supervisor::run(slot, move || {
                        let config = config.clone();
                        async move {
                            let store = CouchScoreStore::connect(config)
                                .await
                                .map_err(StorageError::from)?;
                            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn ScoreStore>)
                        }
                    }));
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "invalid CouchDB settings; falling back to memory store")
                }
            }
        }
    }

    info!("using in-memory score store");
    slot.install(Arc::new(MemoryScoreStore::new())).await;
}

/// Remote leaderboard when `LEADERBOARD_URL` is set, the local store otherwise.
fn leaderboard_gateway(slot: Arc<StoreSlot>) -> anyhow::Result<Arc<dyn LeaderboardGateway>> {
    #[cfg(feature = "http-gateway")]
    {
        use memory_match_back::gateway::HttpLeaderboardGateway;

        if let Ok(url) = env::var("LEADERBOARD_URL") {
            info!(%url, "submitting scores to remote leaderboard");
            let gateway =
                HttpLeaderboardGateway::new(&url).context("building leaderboard client")?;
            return Ok(Arc::new(gateway));
        }
    }

    Ok(Arc::new(StoreGateway::new(slot)))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
