use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Sessions currently hosted by this process.
    pub active_sessions: usize,
}

impl HealthResponse {
    pub fn ok(active_sessions: usize) -> Self {
        Self {
            status: "ok".to_string(),
            active_sessions,
        }
    }

    /// The score store is unreachable; games still run but scores are not kept.
    pub fn degraded(active_sessions: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            active_sessions,
        }
    }
}
