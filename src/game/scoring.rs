use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::difficulty::Difficulty;

/// Ruleset constants for score computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRules {
    /// Score awarded for an instant completion, before the multiplier.
    pub base: u32,
    /// Points lost per elapsed second.
    pub penalty_per_second: u32,
}

impl Default for ScoreRules {
    fn default() -> Self {
        Self {
            base: 1000,
            penalty_per_second: 2,
        }
    }
}

impl ScoreRules {
    /// Score a finished session. Failed sessions earn nothing; successful ones
    /// earn `(base - elapsed * penalty) * multiplier`, rounded to the nearest
    /// integer and clamped at zero.
    pub fn score(&self, success: bool, elapsed_secs: u64, difficulty: Difficulty) -> u32 {
        if !success {
            return 0;
        }

        let elapsed = i64::try_from(elapsed_secs).unwrap_or(i64::MAX);
        let raw = i64::from(self.base)
            .saturating_sub(elapsed.saturating_mul(i64::from(self.penalty_per_second)));
        if raw <= 0 {
            return 0;
        }

        let scaled = (raw as f64 * difficulty.multiplier()).round();
        scaled.min(f64::from(u32::MAX)) as u32
    }
}

/// Outcome of a session as posted to the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScoreRecord {
    /// Unmasked player name as entered.
    pub player_name: String,
    /// Final score; zero for a loss.
    pub score: u32,
    /// Difficulty played.
    pub difficulty: Difficulty,
    /// Seconds between session start and the terminal phase.
    pub time_taken: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(success: bool, elapsed_secs: u64, difficulty: Difficulty) -> u32 {
        ScoreRules::default().score(success, elapsed_secs, difficulty)
    }

    #[test]
    fn failure_scores_zero() {
        for difficulty in Difficulty::ALL {
            for elapsed in [0, 1, 30, 499, 10_000] {
                assert_eq!(score(false, elapsed, difficulty), 0);
            }
        }
    }

    #[test]
    fn instant_easy_win_scores_base() {
        assert_eq!(score(true, 0, Difficulty::Easy), 1000);
        assert_eq!(score(true, 0, Difficulty::Normal), 1500);
        assert_eq!(score(true, 0, Difficulty::Hard), 2000);
    }

    #[test]
    fn score_never_increases_with_time() {
        for difficulty in Difficulty::ALL {
            let mut previous = u32::MAX;
            for elapsed in 0..700 {
                let current = score(true, elapsed, difficulty);
                assert!(current <= previous, "{difficulty} at {elapsed}s");
                previous = current;
            }
        }
    }

    #[test]
    fn penalty_applies_before_multiplier() {
        assert_eq!(score(true, 12, Difficulty::Easy), 976);
        assert_eq!(score(true, 3, Difficulty::Normal), 1491);
        assert_eq!(score(true, 25, Difficulty::Hard), 1900);
    }

    #[test]
    fn long_sessions_clamp_at_zero() {
        assert_eq!(score(true, 500, Difficulty::Normal), 0);
        assert_eq!(score(true, u64::MAX, Difficulty::Hard), 0);
    }

    #[test]
    fn fractional_scores_round_to_nearest() {
        let rules = ScoreRules {
            base: 1000,
            penalty_per_second: 1,
        };
        // 999 * 1.5 = 1498.5
        assert_eq!(rules.score(true, 1, Difficulty::Normal), 1499);
        // 997 * 1.5 = 1495.5
        assert_eq!(rules.score(true, 3, Difficulty::Normal), 1496);
    }
}
