//! DTOs for score submission and the public leaderboard.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::ScoreEntity,
    dto::{format_system_time, validation::validate_player_name},
    game::{Difficulty, ScoreRecord},
};

/// Payload accepted by `POST /api/scores`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScoreSubmission {
    #[validate(custom(function = "validate_player_name"))]
    pub player_name: String,
    pub score: u32,
    pub difficulty: Difficulty,
    pub time_taken: u32,
}

impl From<ScoreSubmission> for ScoreRecord {
    fn from(value: ScoreSubmission) -> Self {
        Self {
            player_name: value.player_name.trim().to_owned(),
            score: value.score,
            difficulty: value.difficulty,
            time_taken: value.time_taken,
        }
    }
}

/// Stored leaderboard row as returned by `/api/scores`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreResponse {
    pub id: Uuid,
    pub player_name: String,
    pub score: u32,
    pub difficulty: Difficulty,
    pub time_taken: u32,
    /// RFC 3339 insertion time.
    pub created_at: String,
}

impl From<ScoreEntity> for ScoreResponse {
    fn from(entity: ScoreEntity) -> Self {
        Self {
            id: entity.id,
            player_name: entity.player_name,
            score: entity.score,
            difficulty: entity.difficulty,
            time_taken: entity.time_taken,
            created_at: format_system_time(entity.created_at),
        }
    }
}

/// Top-three annotation on the leaderboard view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Podium {
    Gold,
    Silver,
    Bronze,
}

impl Podium {
    /// Podium place for a 1-based rank.
    pub fn for_rank(rank: usize) -> Option<Self> {
        match rank {
            1 => Some(Podium::Gold),
            2 => Some(Podium::Silver),
            3 => Some(Podium::Bronze),
            _ => None,
        }
    }
}

/// Public leaderboard row with the player's name masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    pub display_name: String,
    pub score: u32,
    pub difficulty: Difficulty,
    pub time_taken: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub podium: Option<Podium>,
}

/// Ranked, masked rows in the order given (best first).
pub fn leaderboard_entries(records: Vec<ScoreRecord>) -> Vec<LeaderboardEntry> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let rank = index + 1;
            LeaderboardEntry {
                rank,
                display_name: mask_player_name(&record.player_name),
                score: record.score,
                difficulty: record.difficulty,
                time_taken: record.time_taken,
                podium: Podium::for_rank(rank),
            }
        })
        .collect()
}

/// Keep the first character and replace every other one with `*`.
pub fn mask_player_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => std::iter::once(first)
            .chain(chars.map(|_| '*'))
            .collect(),
        None => String::new(),
    }
}
