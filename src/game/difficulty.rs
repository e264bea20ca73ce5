use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Difficulty levels a player can pick before starting a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Six pairs on a four-column grid.
    Easy,
    /// Ten pairs on a five-column grid.
    #[default]
    Normal,
    /// Fifteen pairs on a six-column grid.
    Hard,
}

/// Static layout and scoring parameters attached to a [`Difficulty`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyProfile {
    /// Number of distinct faces dealt (each appears twice).
    pub pairs: usize,
    /// Columns used to lay the grid out.
    pub columns: usize,
    /// Factor applied to the raw score on success.
    pub multiplier: f64,
    /// Countdown length used when no override is configured.
    pub default_time_limit_secs: u32,
}

const EASY: DifficultyProfile = DifficultyProfile {
    pairs: 6,
    columns: 4,
    multiplier: 1.0,
    default_time_limit_secs: 40,
};

const NORMAL: DifficultyProfile = DifficultyProfile {
    pairs: 10,
    columns: 5,
    multiplier: 1.5,
    default_time_limit_secs: 50,
};

const HARD: DifficultyProfile = DifficultyProfile {
    pairs: 15,
    columns: 6,
    multiplier: 2.0,
    default_time_limit_secs: 60,
};

impl Difficulty {
    /// Every difficulty, in ascending order.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    /// Lookup the layout/scoring table entry for this difficulty.
    pub const fn profile(self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => EASY,
            Difficulty::Normal => NORMAL,
            Difficulty::Hard => HARD,
        }
    }

    /// Distinct faces dealt.
    pub const fn pairs(self) -> usize {
        self.profile().pairs
    }

    /// Grid width.
    pub const fn columns(self) -> usize {
        self.profile().columns
    }

    /// Score multiplier on success.
    pub const fn multiplier(self) -> f64 {
        self.profile().multiplier
    }

    /// Largest pair count across all difficulties; the face pool must cover it.
    pub fn max_pairs() -> usize {
        Self::ALL
            .iter()
            .map(|difficulty| difficulty.pairs())
            .max()
            .unwrap_or(0)
    }

    /// Wire name used by the leaderboard payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_layouts() {
        assert_eq!(Difficulty::Easy.pairs(), 6);
        assert_eq!(Difficulty::Easy.columns(), 4);
        assert_eq!(Difficulty::Normal.pairs(), 10);
        assert_eq!(Difficulty::Normal.columns(), 5);
        assert_eq!(Difficulty::Hard.pairs(), 15);
        assert_eq!(Difficulty::Hard.columns(), 6);
        assert_eq!(Difficulty::max_pairs(), 15);
    }

    #[test]
    fn serializes_as_lowercase() {
        let json = serde_json::to_string(&Difficulty::Hard).unwrap();
        assert_eq!(json, "\"hard\"");
        let parsed: Difficulty = serde_json::from_str("\"easy\"").unwrap();
        assert_eq!(parsed, Difficulty::Easy);
        assert!(serde_json::from_str::<Difficulty>("\"expert\"").is_err());
    }
}
