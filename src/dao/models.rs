use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::game::{Difficulty, ScoreRecord};

/// Leaderboard row as persisted by every score store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntity {
    /// Stable identifier assigned on insertion.
    pub id: Uuid,
    /// Unmasked player name.
    pub player_name: String,
    /// Final score.
    pub score: u32,
    /// Difficulty the session was played on.
    pub difficulty: Difficulty,
    /// Seconds the session lasted.
    pub time_taken: u32,
    /// Insertion time; breaks score ties.
    pub created_at: SystemTime,
}

impl ScoreEntity {
    /// Stamp a finished session's record with a fresh id and the current time.
    pub fn from_record(record: ScoreRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_name: record.player_name,
            score: record.score,
            difficulty: record.difficulty,
            time_taken: record.time_taken,
            created_at: SystemTime::now(),
        }
    }

    /// The record without storage metadata.
    pub fn record(&self) -> ScoreRecord {
        ScoreRecord {
            player_name: self.player_name.clone(),
            score: self.score,
            difficulty: self.difficulty,
            time_taken: self.time_taken,
        }
    }
}

/// Leaderboard ordering: score descending, earlier submissions first on ties.
pub fn sort_for_leaderboard(scores: &mut [ScoreEntity]) {
    scores.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}
