//! DTOs exchanged with the session host routes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::FaceCatalog,
    dto::validation::validate_player_name,
    game::{
        CardState, DeckSource, Difficulty, GameResult, GameSession, Scheduler, SessionPhase,
        SessionUpdate,
    },
};

/// Body of `POST /api/sessions`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Difficulty of the initial deck; defaults to normal.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

/// Body of `POST /api/sessions/{id}/start`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartSessionRequest {
    #[validate(custom(function = "validate_player_name"))]
    pub player_name: String,
    pub difficulty: Difficulty,
}

/// Body of `PUT /api/sessions/{id}/difficulty`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectDifficultyRequest {
    pub difficulty: Difficulty,
}

/// Body of `POST /api/sessions/{id}/flip`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FlipRequest {
    pub slot: usize,
}

/// Updates produced by one command, in emission order. Empty when the
/// command was ignored.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommandResponse {
    pub updates: Vec<SessionUpdate>,
}

/// One grid slot as the player may see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CardView {
    pub slot: usize,
    pub state: CardState,
    /// Hidden while the card is face-down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_id: Option<u32>,
    /// Image for the face, hidden with it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Point-in-time view of a hosted session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub phase: SessionPhase,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    pub columns: usize,
    pub cards: Vec<CardView>,
    pub matched_pairs: usize,
    pub total_pairs: usize,
    pub remaining_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
}

impl SessionSnapshot {
    pub fn capture<S: Scheduler, D: DeckSource>(
        id: Uuid,
        session: &GameSession<S, D>,
        faces: &FaceCatalog,
    ) -> Self {
        let cards = session
            .grid()
            .cards()
            .iter()
            .map(|card| {
                let visible = card.state != CardState::FaceDown;
                CardView {
                    slot: card.slot,
                    state: card.state,
                    face_id: visible.then_some(card.face_id),
                    image: visible.then(|| faces.asset_for(card.face_id).to_owned()),
                }
            })
            .collect();

        Self {
            id,
            phase: session.phase(),
            difficulty: session.difficulty(),
            player_name: session.player_name().map(str::to_owned),
            columns: session.grid().columns(),
            cards,
            matched_pairs: session.matched_pairs(),
            total_pairs: session.total_pairs(),
            remaining_secs: session.remaining_secs(),
            result: session.result().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{FixedDeck, GameRules, ManualScheduler};

    #[test]
    fn face_down_cards_keep_their_face_secret() {
        let mut session = GameSession::new(
            GameRules::default(),
            ManualScheduler::new(),
            FixedDeck::new(vec![3, 3, 1, 2, 1, 2, 4, 4, 5, 5, 6, 6]),
            Difficulty::Easy,
        )
        .unwrap();
        let faces = FaceCatalog::numbered(15);
        let id = Uuid::new_v4();

        let idle = SessionSnapshot::capture(id, &session, &faces);
        assert_eq!(idle.phase, SessionPhase::Idle);
        assert_eq!(idle.columns, 4);
        assert_eq!(idle.total_pairs, 6);
        assert!(idle.cards.iter().all(|card| card.face_id.is_none() && card.image.is_none()));

        session.start("ada", Difficulty::Easy).unwrap();
        let preview = SessionSnapshot::capture(id, &session, &faces);
        assert_eq!(preview.cards[0].face_id, Some(3));
        assert_eq!(preview.cards[0].image.as_deref(), Some("/static/images/3.jpg"));
        assert_eq!(preview.player_name.as_deref(), Some("ada"));
    }

    #[test]
    fn start_request_checks_trimmed_name_length() {
        let request = |name: &str| StartSessionRequest {
            player_name: name.to_owned(),
            difficulty: Difficulty::Normal,
        };
        assert!(request(&format!("  {}  ", "가".repeat(32))).validate().is_ok());
        assert!(request(&"x".repeat(33)).validate().is_err());
        assert!(request("   ").validate().is_err());
    }
}
