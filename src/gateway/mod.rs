//! Outbound port through which finished sessions reach a leaderboard.

/// Remote leaderboard over HTTP.
#[cfg(feature = "http-gateway")]
pub mod http;
/// In-process leaderboard backed by the score store.
pub mod local;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::{dao::storage::StorageError, game::ScoreRecord};

#[cfg(feature = "http-gateway")]
pub use http::HttpLeaderboardGateway;
pub use local::StoreGateway;

/// Result alias for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failures reaching the leaderboard.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No score store is installed (degraded mode).
    #[error("leaderboard storage unavailable")]
    Degraded,
    /// The local store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The remote leaderboard could not be reached or answered badly.
    #[error("remote leaderboard request failed: {message}")]
    Remote {
        /// Human-readable context.
        message: String,
        /// Underlying failure.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Leaderboard as seen by a session host.
pub trait LeaderboardGateway: Send + Sync {
    /// Record a finished session.
    fn submit(&self, record: ScoreRecord) -> BoxFuture<'static, GatewayResult<()>>;
    /// Best `limit` records, score descending.
    fn list(&self, limit: usize) -> BoxFuture<'static, GatewayResult<Vec<ScoreRecord>>>;
}
