use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, post, put},
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::session::{
        CommandResponse, CreateSessionRequest, FlipRequest, SelectDifficultyRequest,
        SessionSnapshot, StartSessionRequest,
    },
    error::AppError,
    game::SessionEvent,
    services::{session_service, sse_service},
    state::SharedState,
};

/// Session host endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/{id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/sessions/{id}/difficulty", put(select_difficulty))
        .route("/api/sessions/{id}/start", post(start_session))
        .route("/api/sessions/{id}/flip", post(flip_card))
        .route("/api/sessions/{id}/reset", post(reset_session))
        .route("/api/sessions/{id}/events", get(session_events))
}

/// Create an idle session with a freshly dealt deck.
#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses((status = 201, description = "Session created", body = SessionSnapshot))
)]
pub async fn create_session(
    State(state): State<SharedState>,
    payload: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let Json(request) = payload.unwrap_or_default();
    let snapshot = session_service::create_session(&state, request.difficulty).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Current view of a session. Face-down cards do not reveal their face.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionSnapshot),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(session_service::snapshot(&state, id).await?))
}

/// Stop a session and drop it from the registry.
#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 204, description = "Session stopped"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn delete_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    session_service::delete_session(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change the difficulty of an idle session and redeal.
#[utoipa::path(
    put,
    path = "/api/sessions/{id}/difficulty",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    request_body = SelectDifficultyRequest,
    responses(
        (status = 200, description = "Deck redealt", body = CommandResponse),
        (status = 409, description = "Session is not idle")
    )
)]
pub async fn select_difficulty(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectDifficultyRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let event = SessionEvent::SelectDifficulty(payload.difficulty);
    Ok(Json(session_service::apply(&state, id, event).await?))
}

/// Lock in the player and begin the preview.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/start",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Preview started", body = CommandResponse),
        (status = 400, description = "Empty or oversized player name"),
        (status = 409, description = "Session is not idle")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    payload.validate()?;
    info!(session = %id, difficulty = %payload.difficulty, "start requested");
    let event = SessionEvent::Start {
        player_name: payload.player_name,
        difficulty: payload.difficulty,
    };
    Ok(Json(session_service::apply(&state, id, event).await?))
}

/// Turn a card. Flips that are not allowed right now yield no updates.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/flip",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    request_body = FlipRequest,
    responses((status = 200, description = "Updates caused by the flip", body = CommandResponse))
)]
pub async fn flip_card(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FlipRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let event = SessionEvent::Flip { slot: payload.slot };
    Ok(Json(session_service::apply(&state, id, event).await?))
}

/// Abandon the current game and return to idle.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/reset",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    responses((status = 200, description = "Session reset", body = CommandResponse))
)]
pub async fn reset_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(
        session_service::apply(&state, id, SessionEvent::Reset).await?,
    ))
}

/// Stream session updates, starting with a `snapshot` event.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/events",
    tag = "sessions",
    params(("id" = String, Path, description = "Session identifier")),
    responses((status = 200, description = "Session SSE stream", content_type = "text/event-stream", body = String))
)]
pub async fn session_events(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (receiver, initial) = sse_service::subscribe_session(&state, id).await?;
    info!(session = %id, "new session SSE connection");
    Ok(sse_service::to_sse_stream(id, receiver, initial))
}
