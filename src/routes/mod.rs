use axum::Router;

use crate::state::SharedState;

/// Swagger UI and the OpenAPI document.
pub mod docs;
/// Health check endpoint.
pub mod health;
/// Score submission and leaderboard endpoints.
pub mod scores;
/// Session host endpoints.
pub mod sessions;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(scores::router())
        .merge(sessions::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
