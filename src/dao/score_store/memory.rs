//! Process-local score store used when no database is configured.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::dao::{
    models::{ScoreEntity, sort_for_leaderboard},
    storage::StorageResult,
};

use super::ScoreStore;

/// Scores kept in memory for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreStore {
    scores: Arc<RwLock<Vec<ScoreEntity>>>,
}

impl MemoryScoreStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn submit_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<ScoreEntity>> {
        let scores = self.scores.clone();
        Box::pin(async move {
            scores.write().await.push(score.clone());
            Ok(score)
        })
    }

    fn list_scores(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let scores = self.scores.clone();
        Box::pin(async move {
            let mut rows = scores.read().await.clone();
            sort_for_leaderboard(&mut rows);
            rows.truncate(limit);
            Ok(rows)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use uuid::Uuid;

    use super::*;
    use crate::game::Difficulty;

    fn entity(name: &str, score: u32, offset_secs: u64) -> ScoreEntity {
        ScoreEntity {
            id: Uuid::new_v4(),
            player_name: name.to_owned(),
            score,
            difficulty: Difficulty::Normal,
            time_taken: 30,
            created_at: SystemTime::UNIX_EPOCH + Duration::from_secs(offset_secs),
        }
    }

    #[tokio::test]
    async fn lists_best_scores_first_within_limit() {
        let store = MemoryScoreStore::new();
        for (index, score) in [120, 900, 450, 900, 30].into_iter().enumerate() {
            store
                .submit_score(entity(&format!("p{index}"), score, index as u64))
                .await
                .unwrap();
        }

        let rows = store.list_scores(3).await.unwrap();
        let names: Vec<_> = rows.iter().map(|row| row.player_name.as_str()).collect();
        assert_eq!(names, ["p1", "p3", "p2"]);
    }

    #[tokio::test]
    async fn submit_returns_stored_row() {
        let store = MemoryScoreStore::new();
        let row = entity("ada", 976, 0);
        let stored = store.submit_score(row.clone()).await.unwrap();
        assert_eq!(stored, row);
        assert!(store.health_check().await.is_ok());
        assert_eq!(store.list_scores(10).await.unwrap(), vec![row]);
    }
}
