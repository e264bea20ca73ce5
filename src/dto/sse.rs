use serde::Serialize;
use utoipa::ToSchema;

use crate::game::{ScoreRecord, SessionUpdate};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Session update named after its variant (`card_flipped`, `tick`, ...).
    pub fn from_update(update: &SessionUpdate) -> serde_json::Result<Self> {
        Self::json(Some(update_name(update).to_owned()), update)
    }
}

fn update_name(update: &SessionUpdate) -> &'static str {
    match update {
        SessionUpdate::PhaseChanged { .. } => "phase_changed",
        SessionUpdate::DeckDealt { .. } => "deck_dealt",
        SessionUpdate::CardsRevealed { .. } => "cards_revealed",
        SessionUpdate::CardsHidden { .. } => "cards_hidden",
        SessionUpdate::CardFlipped { .. } => "card_flipped",
        SessionUpdate::PairMatched { .. } => "pair_matched",
        SessionUpdate::PairMismatched { .. } => "pair_mismatched",
        SessionUpdate::Tick { .. } => "tick",
        SessionUpdate::Finished { .. } => "finished",
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent once the finished session's score reached the leaderboard.
pub struct ScoreSubmittedEvent {
    pub record: ScoreRecord,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent when the leaderboard rejected or could not receive the score.
pub struct ScoreSubmitFailedEvent {
    pub record: ScoreRecord,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::SessionPhase;

    #[test]
    fn update_event_is_named_after_variant() {
        let event = ServerEvent::from_update(&SessionUpdate::Tick { remaining_secs: 7 }).unwrap();
        assert_eq!(event.event.as_deref(), Some("tick"));
        assert_eq!(event.data, r#"{"type":"tick","remaining_secs":7}"#);

        let event = ServerEvent::from_update(&SessionUpdate::PhaseChanged {
            phase: SessionPhase::Playing,
        })
        .unwrap();
        assert_eq!(event.event.as_deref(), Some("phase_changed"));
        assert_eq!(event.data, r#"{"type":"phase_changed","phase":"playing"}"#);
    }
}
