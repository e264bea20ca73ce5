use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{deck::DeckError, difficulty::Difficulty, scoring::ScoreRules};

/// Countdown length per difficulty, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLimits {
    /// Seconds for easy.
    pub easy: u32,
    /// Seconds for normal.
    pub normal: u32,
    /// Seconds for hard.
    pub hard: u32,
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            easy: Difficulty::Easy.profile().default_time_limit_secs,
            normal: Difficulty::Normal.profile().default_time_limit_secs,
            hard: Difficulty::Hard.profile().default_time_limit_secs,
        }
    }
}

impl TimeLimits {
    /// Limit configured for `difficulty`.
    pub fn for_difficulty(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Normal => self.normal,
            Difficulty::Hard => self.hard,
        }
    }
}

/// Tunables shared by every session of a host.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    /// Size of the face pool decks are dealt from.
    pub total_faces: u32,
    /// How long every card stays face-up after start.
    pub preview: Duration,
    /// Pause between the second flip and the pair comparison.
    pub resolve_delay: Duration,
    /// Countdown length per difficulty.
    pub time_limits: TimeLimits,
    /// Score formula constants.
    pub scoring: ScoreRules,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            total_faces: Difficulty::max_pairs() as u32,
            preview: Duration::from_secs(10),
            resolve_delay: Duration::from_millis(300),
            time_limits: TimeLimits::default(),
            scoring: ScoreRules::default(),
        }
    }
}

impl GameRules {
    /// Countdown length in seconds for `difficulty`.
    pub fn time_limit(&self, difficulty: Difficulty) -> u32 {
        self.time_limits.for_difficulty(difficulty)
    }

    /// Every difficulty must be dealable from the face pool. Checked once at
    /// startup so sessions never hit an insufficient pool.
    pub fn ensure_dealable(&self) -> Result<(), DeckError> {
        match Difficulty::ALL
            .into_iter()
            .find(|difficulty| (self.total_faces as usize) < difficulty.pairs())
        {
            Some(difficulty) => Err(DeckError::InsufficientFaces {
                difficulty,
                required: difficulty.pairs(),
                available: self.total_faces,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_difficulty() {
        let rules = GameRules::default();
        assert_eq!(rules.total_faces, 15);
        assert!(rules.ensure_dealable().is_ok());
        assert_eq!(rules.time_limit(Difficulty::Easy), 40);
        assert_eq!(rules.time_limit(Difficulty::Normal), 50);
        assert_eq!(rules.time_limit(Difficulty::Hard), 60);
    }

    #[test]
    fn small_pool_fails_on_first_uncovered_difficulty() {
        let rules = GameRules {
            total_faces: 10,
            ..GameRules::default()
        };
        assert_eq!(
            rules.ensure_dealable(),
            Err(DeckError::InsufficientFaces {
                difficulty: Difficulty::Hard,
                required: 15,
                available: 10,
            })
        );
    }
}
