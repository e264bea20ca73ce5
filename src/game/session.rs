//! Session state machine: `Idle -> Previewing -> Playing -> {Won, Lost}`, with
//! `Reset` returning to `Idle` from anywhere.
//!
//! The machine is driven by commands ([`SessionEvent`]) and answers each one
//! with the [`SessionUpdate`]s it produced. Delays go through the injected
//! [`Scheduler`]; every callback carries the [`TimerId`] it was scheduled
//! under and is dropped unless that id is still the pending one, so a late
//! callback can never touch a superseded phase.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::{
    countdown::{Countdown, CountdownStep},
    deck::{DeckError, DeckSource},
    difficulty::Difficulty,
    grid::{CardGrid, CardState, MatchOutcome, SelectionBuffer},
    rules::GameRules,
    scheduler::{Scheduler, TimerId, TimerKind},
    scoring::ScoreRecord,
};

/// Lifecycle phases of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for a player; difficulty may still change.
    Idle,
    /// All cards shown face-up before play begins.
    Previewing,
    /// Countdown running, flips accepted.
    Playing,
    /// Every pair matched in time.
    Won,
    /// Countdown ran out.
    Lost,
}

/// Commands accepted by [`GameSession::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Change difficulty while idle.
    SelectDifficulty(Difficulty),
    /// Lock in a player and difficulty, deal, and start the preview.
    Start {
        /// Name recorded on the leaderboard.
        player_name: String,
        /// Difficulty to deal for.
        difficulty: Difficulty,
    },
    /// Player turned a card.
    Flip {
        /// Grid position of the card.
        slot: usize,
    },
    /// A scheduled callback fired.
    Timer {
        /// Handle the callback was scheduled under.
        id: TimerId,
        /// What the callback is for.
        kind: TimerKind,
    },
    /// Back to idle with a fresh deck.
    Reset,
}

/// Commands a session refuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The player name is empty or whitespace-only.
    #[error("player name must not be empty")]
    EmptyPlayerName,
    /// The command is not allowed in the current phase.
    #[error("cannot {action} while the session is {phase:?}")]
    InvalidPhase {
        /// Rejected command.
        action: &'static str,
        /// Phase the session was in.
        phase: SessionPhase,
    },
    /// No deck could be dealt for the requested difficulty.
    #[error(transparent)]
    Deck(#[from] DeckError),
}

/// Face-up card exposed to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RevealedCard {
    /// Grid position.
    pub slot: usize,
    /// Face shown at that position.
    pub face_id: u32,
}

/// Terminal result of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct GameResult {
    /// True when every pair was matched before the countdown ran out.
    pub success: bool,
    /// What gets posted to the leaderboard.
    pub record: ScoreRecord,
}

/// Observable changes produced by a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// The session entered a new phase.
    PhaseChanged {
        /// Phase now in effect.
        phase: SessionPhase,
    },
    /// A new deck replaced the grid.
    DeckDealt {
        /// Difficulty the deck was dealt for.
        difficulty: Difficulty,
        /// Number of cards on the grid.
        cards: usize,
        /// Grid width.
        columns: usize,
        /// Countdown length once play starts.
        time_limit_secs: u32,
    },
    /// Cards turned face-up by the preview.
    CardsRevealed {
        /// Every revealed slot with its face.
        cards: Vec<RevealedCard>,
    },
    /// Cards turned back face-down.
    CardsHidden {
        /// Slots that were hidden.
        slots: Vec<usize>,
    },
    /// The player turned a card.
    CardFlipped {
        /// Turned slot.
        slot: usize,
        /// Face it shows.
        face_id: u32,
    },
    /// Both selected cards share a face.
    PairMatched {
        /// The matched slots in flip order.
        #[schema(value_type = Vec<usize>)]
        slots: [usize; 2],
        /// Pairs matched so far.
        matched_pairs: usize,
    },
    /// The selected cards differ and will be hidden.
    PairMismatched {
        /// The mismatched slots in flip order.
        #[schema(value_type = Vec<usize>)]
        slots: [usize; 2],
    },
    /// One second of the countdown elapsed.
    Tick {
        /// Seconds left.
        remaining_secs: u32,
    },
    /// The session reached Won or Lost.
    Finished {
        /// Outcome and leaderboard record.
        result: GameResult,
    },
}

/// One player's game, from deck to score.
pub struct GameSession<S, D> {
    rules: GameRules,
    scheduler: S,
    dealer: D,
    phase: SessionPhase,
    difficulty: Difficulty,
    player_name: Option<String>,
    grid: CardGrid,
    selection: SelectionBuffer,
    matched_pairs: usize,
    countdown: Countdown,
    preview_timer: Option<TimerId>,
    resolve_timer: Option<TimerId>,
    started_at: Option<Instant>,
    result: Option<GameResult>,
}

impl<S: Scheduler, D: DeckSource> GameSession<S, D> {
    /// Create an idle session with a deck dealt for `difficulty`.
    pub fn new(
        rules: GameRules,
        scheduler: S,
        mut dealer: D,
        difficulty: Difficulty,
    ) -> Result<Self, SessionError> {
        let grid = CardGrid::new(dealer.build(difficulty, rules.total_faces)?);
        let countdown = Countdown::new(rules.time_limit(difficulty));
        Ok(Self {
            rules,
            scheduler,
            dealer,
            phase: SessionPhase::Idle,
            difficulty,
            player_name: None,
            grid,
            selection: SelectionBuffer::new(),
            matched_pairs: 0,
            countdown,
            preview_timer: None,
            resolve_timer: None,
            started_at: None,
            result: None,
        })
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Difficulty of the dealt deck.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Name given at start, if the session was started.
    pub fn player_name(&self) -> Option<&str> {
        self.player_name.as_deref()
    }

    /// Cards of the current deal.
    pub fn grid(&self) -> &CardGrid {
        &self.grid
    }

    /// Slots flipped but not yet resolved.
    pub fn selection(&self) -> &SelectionBuffer {
        &self.selection
    }

    /// Pairs matched in this round.
    pub fn matched_pairs(&self) -> usize {
        self.matched_pairs
    }

    /// Pairs on the grid.
    pub fn total_pairs(&self) -> usize {
        self.grid.len() / 2
    }

    /// Seconds left on the countdown.
    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining()
    }

    /// Outcome once the session is Won or Lost.
    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    /// Tunables the session was built with.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Scheduler driving the session's callbacks.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Mutable access to the scheduler, used to deliver fake-clock callbacks.
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Dispatch a command to the matching operation.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<SessionUpdate>, SessionError> {
        match event {
            SessionEvent::SelectDifficulty(difficulty) => self.select_difficulty(difficulty),
            SessionEvent::Start {
                player_name,
                difficulty,
            } => self.start(&player_name, difficulty),
            SessionEvent::Flip { slot } => Ok(self.flip(slot)),
            SessionEvent::Timer { id, kind } => Ok(self.on_timer(id, kind)),
            SessionEvent::Reset => self.reset(),
        }
    }

    /// Rebuild the grid for another difficulty. Only allowed while idle.
    pub fn select_difficulty(
        &mut self,
        difficulty: Difficulty,
    ) -> Result<Vec<SessionUpdate>, SessionError> {
        self.ensure_phase(SessionPhase::Idle, "change difficulty")?;
        let deck = self.dealer.build(difficulty, self.rules.total_faces)?;

        self.difficulty = difficulty;
        self.grid = CardGrid::new(deck);
        self.countdown
            .reset(self.rules.time_limit(difficulty), &mut self.scheduler);
        Ok(vec![self.deck_dealt()])
    }

    /// Lock in the player, deal and begin the preview.
    pub fn start(
        &mut self,
        player_name: &str,
        difficulty: Difficulty,
    ) -> Result<Vec<SessionUpdate>, SessionError> {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(SessionError::EmptyPlayerName);
        }
        self.ensure_phase(SessionPhase::Idle, "start")?;
        let deck = self.dealer.build(difficulty, self.rules.total_faces)?;

        self.difficulty = difficulty;
        self.player_name = Some(player_name.to_owned());
        self.grid = CardGrid::new(deck);
        self.selection.clear();
        self.matched_pairs = 0;
        self.result = None;
        self.countdown
            .reset(self.rules.time_limit(difficulty), &mut self.scheduler);
        self.started_at = Some(self.scheduler.now());

        self.grid.reveal_all();
        self.phase = SessionPhase::Previewing;
        self.preview_timer = Some(
            self.scheduler
                .schedule(self.rules.preview, TimerKind::PreviewExpired),
        );
        debug!(player = player_name, %difficulty, "session started");

        let cards = self
            .grid
            .cards()
            .iter()
            .map(|card| RevealedCard {
                slot: card.slot,
                face_id: card.face_id,
            })
            .collect();
        Ok(vec![
            self.deck_dealt(),
            SessionUpdate::PhaseChanged { phase: self.phase },
            SessionUpdate::CardsRevealed { cards },
        ])
    }

    /// Turn a card. Anything that is not a valid flip in the current state is
    /// ignored and produces no update.
    pub fn flip(&mut self, slot: usize) -> Vec<SessionUpdate> {
        if self.phase != SessionPhase::Playing {
            debug!(slot, phase = ?self.phase, "flip ignored outside play");
            return Vec::new();
        }
        if self.selection.is_full() || self.selection.contains(slot) {
            debug!(slot, "flip ignored: selection busy");
            return Vec::new();
        }

        match self.grid.flip(slot) {
            Ok(true) => {}
            Ok(false) => return Vec::new(),
            Err(err) => {
                debug!(error = %err, "flip ignored");
                return Vec::new();
            }
        }
        self.selection.push(slot);

        if self.selection.is_full() {
            self.resolve_timer = Some(
                self.scheduler
                    .schedule(self.rules.resolve_delay, TimerKind::ResolveSelection),
            );
        }

        let face_id = self.grid.cards()[slot].face_id;
        vec![SessionUpdate::CardFlipped { slot, face_id }]
    }

    /// Deliver a scheduled callback.
    pub fn on_timer(&mut self, id: TimerId, kind: TimerKind) -> Vec<SessionUpdate> {
        match kind {
            TimerKind::PreviewExpired => {
                if self.phase != SessionPhase::Previewing || self.preview_timer != Some(id) {
                    return Vec::new();
                }
                self.preview_timer = None;
                self.begin_play()
            }
            TimerKind::CountdownTick => {
                if self.phase != SessionPhase::Playing {
                    return Vec::new();
                }
                match self.countdown.on_tick(id, &mut self.scheduler) {
                    CountdownStep::Running(remaining_secs) => {
                        vec![SessionUpdate::Tick { remaining_secs }]
                    }
                    CountdownStep::Expired => {
                        let mut updates = vec![SessionUpdate::Tick { remaining_secs: 0 }];
                        updates.extend(self.finish(false));
                        updates
                    }
                    CountdownStep::Stale => Vec::new(),
                }
            }
            TimerKind::ResolveSelection => {
                if self.phase != SessionPhase::Playing || self.resolve_timer != Some(id) {
                    return Vec::new();
                }
                self.resolve_timer = None;
                self.resolve_selection()
            }
        }
    }

    /// Abandon whatever is in progress and return to idle with a fresh deck for
    /// the current difficulty.
    pub fn reset(&mut self) -> Result<Vec<SessionUpdate>, SessionError> {
        let deck = self
            .dealer
            .build(self.difficulty, self.rules.total_faces)?;

        self.cancel_timers();
        self.grid = CardGrid::new(deck);
        self.selection.clear();
        self.matched_pairs = 0;
        self.countdown
            .reset(self.rules.time_limit(self.difficulty), &mut self.scheduler);
        self.player_name = None;
        self.started_at = None;
        self.result = None;
        self.phase = SessionPhase::Idle;

        Ok(vec![
            SessionUpdate::PhaseChanged { phase: self.phase },
            self.deck_dealt(),
        ])
    }

    fn begin_play(&mut self) -> Vec<SessionUpdate> {
        let slots = self
            .grid
            .cards()
            .iter()
            .filter(|card| card.state == CardState::FaceUp)
            .map(|card| card.slot)
            .collect();
        self.grid.hide_unmatched();
        self.countdown
            .start(self.rules.time_limit(self.difficulty), &mut self.scheduler);
        self.phase = SessionPhase::Playing;

        vec![
            SessionUpdate::CardsHidden { slots },
            SessionUpdate::PhaseChanged { phase: self.phase },
        ]
    }

    fn resolve_selection(&mut self) -> Vec<SessionUpdate> {
        let &[first, second] = self.selection.slots() else {
            warn!(selected = self.selection.len(), "resolution fired without a full pair");
            self.selection.clear();
            return Vec::new();
        };
        let slots = [first, second];

        let outcome = self.grid.resolve_match(&self.selection);
        self.selection.clear();

        match outcome {
            Ok(MatchOutcome::Matched) => {
                self.matched_pairs += 1;
                let mut updates = vec![SessionUpdate::PairMatched {
                    slots,
                    matched_pairs: self.matched_pairs,
                }];
                if self.grid.is_complete() {
                    updates.extend(self.finish(true));
                }
                updates
            }
            Ok(MatchOutcome::Mismatch) => {
                if let Err(err) = self.grid.hide(&slots) {
                    warn!(error = %err, "failed to hide mismatched pair");
                }
                vec![SessionUpdate::PairMismatched { slots }]
            }
            Err(err) => {
                warn!(error = %err, "match resolution failed");
                Vec::new()
            }
        }
    }

    /// Enter a terminal phase and compute the score.
    fn finish(&mut self, success: bool) -> Vec<SessionUpdate> {
        self.cancel_timers();
        self.selection.clear();
        self.phase = if success {
            SessionPhase::Won
        } else {
            SessionPhase::Lost
        };

        let elapsed_secs = self
            .started_at
            .map(|started| {
                self.scheduler
                    .now()
                    .saturating_duration_since(started)
                    .as_secs()
            })
            .unwrap_or_default();
        let score = self
            .rules
            .scoring
            .score(success, elapsed_secs, self.difficulty);
        let result = GameResult {
            success,
            record: ScoreRecord {
                player_name: self.player_name.clone().unwrap_or_default(),
                score,
                difficulty: self.difficulty,
                time_taken: u32::try_from(elapsed_secs).unwrap_or(u32::MAX),
            },
        };
        debug!(success, score, elapsed_secs, "session finished");
        self.result = Some(result.clone());

        vec![
            SessionUpdate::PhaseChanged { phase: self.phase },
            SessionUpdate::Finished { result },
        ]
    }

    fn cancel_timers(&mut self) {
        self.countdown.stop(&mut self.scheduler);
        if let Some(id) = self.preview_timer.take() {
            self.scheduler.cancel(id);
        }
        if let Some(id) = self.resolve_timer.take() {
            self.scheduler.cancel(id);
        }
    }

    fn ensure_phase(&self, expected: SessionPhase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase {
                action,
                phase: self.phase,
            })
        }
    }

    fn deck_dealt(&self) -> SessionUpdate {
        SessionUpdate::DeckDealt {
            difficulty: self.difficulty,
            cards: self.grid.len(),
            columns: self.grid.columns(),
            time_limit_secs: self.rules.time_limit(self.difficulty),
        }
    }
}
