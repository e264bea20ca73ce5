use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report health, pinging the score store when one is installed.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_score_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let active_sessions = state.sessions().len();
    if state.is_degraded() {
        HealthResponse::degraded(active_sessions)
    } else {
        HealthResponse::ok(active_sessions)
    }
}
