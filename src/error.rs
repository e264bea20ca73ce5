use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, game::SessionError, gateway::GatewayError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The leaderboard could not be reached.
    #[error("leaderboard unavailable: {0}")]
    Leaderboard(String),
    /// A session actor stopped before answering.
    #[error("session {0} is no longer running")]
    SessionGone(String),
    /// Server-side failure unrelated to the request.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::EmptyPlayerName => ServiceError::InvalidInput(err.to_string()),
            SessionError::InvalidPhase { .. } => ServiceError::InvalidState(err.to_string()),
            // Startup validation keeps this unreachable with a valid config.
            SessionError::Deck(deck) => ServiceError::InvalidState(deck.to_string()),
        }
    }
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Degraded => ServiceError::Degraded,
            GatewayError::Storage(source) => ServiceError::Unavailable(source),
            remote @ GatewayError::Remote { .. } => ServiceError::Leaderboard(remote.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Upstream leaderboard failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Internal server error.
    #[error("internal server error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Leaderboard(message) => AppError::BadGateway(message),
            gone @ ServiceError::SessionGone(_) => AppError::NotFound(gone.to_string()),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::SessionPhase;

    fn status_of(err: impl Into<ServiceError>) -> StatusCode {
        AppError::from(err.into()).into_response().status()
    }

    #[test]
    fn session_errors_map_to_client_statuses() {
        assert_eq!(status_of(SessionError::EmptyPlayerName), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(SessionError::InvalidPhase {
                action: "start",
                phase: SessionPhase::Playing
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn gateway_errors_map_to_upstream_statuses() {
        assert_eq!(status_of(GatewayError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(GatewayError::Remote {
                message: "boom".into(),
                source: None
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn internal_failures_are_server_errors() {
        assert_eq!(
            status_of(ServiceError::Internal("failed to encode snapshot".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
