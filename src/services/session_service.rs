//! Business logic behind the session routes: registry bookkeeping around the
//! per-session tasks.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    dto::session::{CommandResponse, SessionSnapshot},
    error::ServiceError,
    game::{Difficulty, RandomDeck, SessionEvent},
    services::session_runtime::{self, SessionContext, SessionHandle},
    state::SharedState,
};

fn context(state: &SharedState) -> SessionContext {
    let config = state.config();
    let registry = Arc::downgrade(state);
    SessionContext {
        rules: config.rules().clone(),
        faces: config.faces().clone(),
        gateway: state.gateway(),
        idle_ttl: config.session_idle_ttl(),
        on_stop: Some(Arc::new(move |id: Uuid| {
            let Some(state) = registry.upgrade() else {
                return;
            };
            if state.sessions().remove(&id).is_some() {
                info!(session = %id, "idle session evicted");
            }
        })),
    }
}

/// Spawn an idle session and register it.
pub async fn create_session(
    state: &SharedState,
    difficulty: Option<Difficulty>,
) -> Result<SessionSnapshot, ServiceError> {
    let id = Uuid::new_v4();
    let handle = session_runtime::spawn(
        id,
        context(state),
        RandomDeck::from_os_rng(),
        difficulty.unwrap_or_default(),
    )?;
    state.sessions().insert(id, handle.clone());
    handle.snapshot().await
}

/// Current view of a registered session.
pub async fn snapshot(state: &SharedState, id: Uuid) -> Result<SessionSnapshot, ServiceError> {
    state.session(id)?.snapshot().await
}

/// Forward a command to the session task.
pub async fn apply(
    state: &SharedState,
    id: Uuid,
    event: SessionEvent,
) -> Result<CommandResponse, ServiceError> {
    let updates = state.session(id)?.apply(event).await?;
    Ok(CommandResponse { updates })
}

/// Stop and forget a session.
pub async fn delete_session(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let (_, handle) = state
        .sessions()
        .remove(&id)
        .ok_or_else(|| ServiceError::NotFound(format!("session {id}")))?;
    handle.shutdown().await;
    info!(session = %id, "session deleted");
    Ok(())
}

/// Handle of a registered session.
pub fn session_handle(state: &SharedState, id: Uuid) -> Result<SessionHandle, ServiceError> {
    state.session(id)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{config::AppConfig, game::SessionPhase, state::AppState};

    #[tokio::test(start_paused = true)]
    async fn session_lifecycle_through_registry() {
        let state = AppState::new(AppConfig::default());
        let created = create_session(&state, Some(Difficulty::Easy)).await.unwrap();
        assert_eq!(created.phase, SessionPhase::Idle);
        assert_eq!(created.cards.len(), 12);
        assert_eq!(state.sessions().len(), 1);

        let response = apply(
            &state,
            created.id,
            SessionEvent::SelectDifficulty(Difficulty::Hard),
        )
        .await
        .unwrap();
        assert_eq!(response.updates.len(), 1);
        assert_eq!(snapshot(&state, created.id).await.unwrap().cards.len(), 30);

        delete_session(&state, created.id).await.unwrap();
        assert!(matches!(
            snapshot(&state, created.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            delete_session(&state, created.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_and_abandoned_sessions_leave_the_registry() {
        let state = AppState::new(AppConfig::default());
        let mut ids = Vec::new();
        for index in 0..5 {
            let created = create_session(&state, Some(Difficulty::Easy)).await.unwrap();
            if index % 2 == 0 {
                apply(
                    &state,
                    created.id,
                    SessionEvent::Start {
                        player_name: format!("player{index}"),
                        difficulty: Difficulty::Easy,
                    },
                )
                .await
                .unwrap();
            }
            ids.push(created.id);
        }
        assert_eq!(state.sessions().len(), 5);

        tokio::time::sleep(Duration::from_secs(60 * 60)).await;
        tokio::task::yield_now().await;

        assert!(state.sessions().is_empty());
        for id in ids {
            assert!(matches!(
                snapshot(&state, id).await,
                Err(ServiceError::NotFound(_))
            ));
        }
    }
}
