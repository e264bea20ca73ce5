/// CouchDB-backed store.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-memory store.
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::{models::ScoreEntity, storage::StorageResult};

pub use memory::MemoryScoreStore;

/// Abstraction over the persistence layer for leaderboard rows.
pub trait ScoreStore: Send + Sync {
    /// Persist a new row and return it as stored.
    fn submit_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<ScoreEntity>>;
    /// Best `limit` rows, score descending.
    fn list_scores(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection in place.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
