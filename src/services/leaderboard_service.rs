//! Leaderboard reads and writes: the raw score API served from the local
//! store, and the masked view read through the gateway.

use tracing::{debug, warn};

use crate::{
    dao::models::ScoreEntity,
    dto::leaderboard::{LeaderboardEntry, ScoreResponse, ScoreSubmission, leaderboard_entries},
    error::ServiceError,
    state::SharedState,
};

/// Persist a validated submission.
pub async fn submit_score(
    state: &SharedState,
    submission: ScoreSubmission,
) -> Result<ScoreResponse, ServiceError> {
    let store = state.require_score_store().await?;
    let stored = store
        .submit_score(ScoreEntity::from_record(submission.into()))
        .await
        .inspect_err(|err| warn!(error = %err, "failed to store score"))?;
    debug!(id = %stored.id, score = stored.score, "score stored");
    Ok(stored.into())
}

/// Best scores, capped at the configured limit.
pub async fn list_scores(state: &SharedState) -> Result<Vec<ScoreResponse>, ServiceError> {
    let store = state.require_score_store().await?;
    let rows = store
        .list_scores(state.config().leaderboard_limit())
        .await
        .inspect_err(|err| warn!(error = %err, "failed to list scores"))?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Masked, ranked view of the leaderboard sessions report to.
pub async fn leaderboard(state: &SharedState) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let records = state
        .gateway()
        .list(state.config().leaderboard_limit())
        .await
        .inspect_err(|err| warn!(error = %err, "failed to fetch leaderboard"))?;
    Ok(leaderboard_entries(records))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::score_store::MemoryScoreStore, dto::leaderboard::Podium,
        game::Difficulty, state::AppState,
    };

    fn submission(name: &str, score: u32) -> ScoreSubmission {
        ScoreSubmission {
            player_name: name.into(),
            score,
            difficulty: Difficulty::Easy,
            time_taken: 15,
        }
    }

    #[tokio::test]
    async fn degraded_without_store() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            submit_score(&state, submission("ada", 1)).await,
            Err(ServiceError::Degraded)
        ));
        assert!(matches!(list_scores(&state).await, Err(ServiceError::Degraded)));
    }

    #[tokio::test]
    async fn list_is_ordered_and_limited() {
        let state = AppState::new(AppConfig::default());
        state
            .store()
            .install(Arc::new(MemoryScoreStore::new()))
            .await;

        for index in 0..12u32 {
            submit_score(&state, submission(&format!("player{index}"), index * 10))
                .await
                .unwrap();
        }

        let scores = list_scores(&state).await.unwrap();
        assert_eq!(scores.len(), 10);
        assert_eq!(scores[0].score, 110);
        assert!(scores.windows(2).all(|pair| pair[0].score >= pair[1].score));

        let view = leaderboard(&state).await.unwrap();
        assert_eq!(view[0].display_name, "p*******");
        assert_eq!(view[0].podium, Some(Podium::Gold));
        assert_eq!(view.len(), 10);
    }
}
