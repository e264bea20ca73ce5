use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use validator::Validate;

use crate::{
    dto::leaderboard::{LeaderboardEntry, ScoreResponse, ScoreSubmission},
    error::AppError,
    services::leaderboard_service,
    state::SharedState,
};

/// Leaderboard endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/scores", get(list_scores).post(submit_score))
        .route("/api/leaderboard", get(leaderboard))
}

/// Best scores, highest first.
#[utoipa::path(
    get,
    path = "/api/scores",
    tag = "scores",
    responses(
        (status = 200, description = "Top scores", body = [ScoreResponse]),
        (status = 503, description = "Score store unavailable")
    )
)]
pub async fn list_scores(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ScoreResponse>>, AppError> {
    Ok(Json(leaderboard_service::list_scores(&state).await?))
}

/// Record a finished game.
#[utoipa::path(
    post,
    path = "/api/scores",
    tag = "scores",
    request_body = ScoreSubmission,
    responses(
        (status = 201, description = "Score stored", body = ScoreResponse),
        (status = 400, description = "Invalid submission"),
        (status = 503, description = "Score store unavailable")
    )
)]
pub async fn submit_score(
    State(state): State<SharedState>,
    Json(payload): Json<ScoreSubmission>,
) -> Result<(StatusCode, Json<ScoreResponse>), AppError> {
    payload.validate()?;
    let stored = leaderboard_service::submit_score(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Ranked leaderboard with masked player names.
#[utoipa::path(
    get,
    path = "/api/leaderboard",
    tag = "scores",
    responses(
        (status = 200, description = "Ranked, masked leaderboard", body = [LeaderboardEntry]),
        (status = 502, description = "Remote leaderboard failed"),
        (status = 503, description = "Score store unavailable")
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    Ok(Json(leaderboard_service::leaderboard(&state).await?))
}
