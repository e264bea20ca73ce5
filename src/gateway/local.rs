use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{dao::models::ScoreEntity, game::ScoreRecord, state::StoreSlot};

use super::{GatewayError, GatewayResult, LeaderboardGateway};

/// Gateway writing straight into whichever score store is installed in-process.
#[derive(Clone)]
pub struct StoreGateway {
    slot: Arc<StoreSlot>,
}

impl StoreGateway {
    /// Gateway writing into whatever store `slot` holds.
    pub fn new(slot: Arc<StoreSlot>) -> Self {
        Self { slot }
    }
}

impl LeaderboardGateway for StoreGateway {
    fn submit(&self, record: ScoreRecord) -> BoxFuture<'static, GatewayResult<()>> {
        let slot = self.slot.clone();
        Box::pin(async move {
            let store = slot.get().await.ok_or(GatewayError::Degraded)?;
            store.submit_score(ScoreEntity::from_record(record)).await?;
            Ok(())
        })
    }

    fn list(&self, limit: usize) -> BoxFuture<'static, GatewayResult<Vec<ScoreRecord>>> {
        let slot = self.slot.clone();
        Box::pin(async move {
            let store = slot.get().await.ok_or(GatewayError::Degraded)?;
            let rows = store.list_scores(limit).await?;
            Ok(rows.iter().map(ScoreEntity::record).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dao::score_store::MemoryScoreStore, game::Difficulty};

    fn record(name: &str, score: u32) -> ScoreRecord {
        ScoreRecord {
            player_name: name.into(),
            score,
            difficulty: Difficulty::Normal,
            time_taken: 12,
        }
    }

    #[tokio::test]
    async fn degraded_without_store() {
        let gateway = StoreGateway::new(Arc::new(StoreSlot::new()));
        assert!(matches!(
            gateway.submit(record("ada", 10)).await,
            Err(GatewayError::Degraded)
        ));
        assert!(matches!(gateway.list(10).await, Err(GatewayError::Degraded)));
    }

    #[tokio::test]
    async fn writes_through_installed_store() {
        let slot = Arc::new(StoreSlot::new());
        slot.install(Arc::new(MemoryScoreStore::new())).await;
        let gateway = StoreGateway::new(slot);

        gateway.submit(record("ada", 10)).await.unwrap();
        gateway.submit(record("bob", 40)).await.unwrap();
        let listed = gateway.list(1).await.unwrap();
        assert_eq!(listed, vec![record("bob", 40)]);
    }
}
