use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the memory-match backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::scores::list_scores,
        crate::routes::scores::submit_score,
        crate::routes::scores::leaderboard,
        crate::routes::sessions::create_session,
        crate::routes::sessions::get_session,
        crate::routes::sessions::delete_session,
        crate::routes::sessions::select_difficulty,
        crate::routes::sessions::start_session,
        crate::routes::sessions::flip_card,
        crate::routes::sessions::reset_session,
        crate::routes::sessions::session_events,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::leaderboard::ScoreSubmission,
            crate::dto::leaderboard::ScoreResponse,
            crate::dto::leaderboard::LeaderboardEntry,
            crate::dto::leaderboard::Podium,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::StartSessionRequest,
            crate::dto::session::SelectDifficultyRequest,
            crate::dto::session::FlipRequest,
            crate::dto::session::CommandResponse,
            crate::dto::session::SessionSnapshot,
            crate::dto::session::CardView,
            crate::dto::sse::ScoreSubmittedEvent,
            crate::dto::sse::ScoreSubmitFailedEvent,
            crate::game::Difficulty,
            crate::game::CardState,
            crate::game::SessionPhase,
            crate::game::SessionUpdate,
            crate::game::RevealedCard,
            crate::game::GameResult,
            crate::game::ScoreRecord,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "scores", description = "Leaderboard submission and queries"),
        (name = "sessions", description = "Hosted memory-match sessions"),
    )
)]
pub struct ApiDoc;
