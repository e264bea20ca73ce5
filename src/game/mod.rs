//! Sans-IO memory-match engine: decks, grid, countdown, scoring and the
//! session state machine. Nothing here touches the network or sleeps.

/// Per-second countdown over a scheduler.
pub mod countdown;
/// Deck dealing and shuffling.
pub mod deck;
/// Difficulty levels and their layout table.
pub mod difficulty;
/// Card grid and selection buffer.
pub mod grid;
/// Tunables shared by every session.
pub mod rules;
/// Timer port and the fake clock.
pub mod scheduler;
/// Score computation and leaderboard records.
pub mod scoring;
/// Session state machine.
pub mod session;

pub use deck::{DeckError, DeckSource, FixedDeck, RandomDeck};
pub use difficulty::Difficulty;
pub use grid::{Card, CardState};
pub use rules::{GameRules, TimeLimits};
pub use scheduler::{ManualScheduler, Scheduler, TimerId, TimerKind};
pub use scoring::{ScoreRecord, ScoreRules};
pub use session::{
    GameResult, GameSession, RevealedCard, SessionError, SessionEvent, SessionPhase, SessionUpdate,
};
