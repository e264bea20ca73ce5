use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::{deck::Deck, difficulty::Difficulty};

/// Visibility state of a single card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    /// Hidden from the player.
    FaceDown,
    /// Showing its face, not yet matched.
    FaceUp,
    /// Part of a matched pair; stays face-up.
    Matched,
}

/// One slot of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Position in the grid, stable for the whole session.
    pub slot: usize,
    /// Which face (image) the card shows once turned.
    pub face_id: u32,
    /// Current visibility.
    pub state: CardState,
}

/// Result of comparing the two buffered cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Both cards show the same face.
    Matched,
    /// The faces differ.
    Mismatch,
}

/// Grid operations that cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// The slot does not exist.
    #[error("slot {slot} is outside the grid (size {len})")]
    InvalidSlot {
        /// Requested slot.
        slot: usize,
        /// Grid size.
        len: usize,
    },
    /// Resolution was requested without a full selection.
    #[error("match resolution needs exactly two selected cards, got {selected}")]
    Precondition {
        /// Cards currently selected.
        selected: usize,
    },
}

/// Ordered selection of at most two face-up, unresolved slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionBuffer {
    slots: Vec<usize>,
}

impl SelectionBuffer {
    /// Cards compared at once.
    pub const CAPACITY: usize = 2;

    /// Empty buffer.
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(Self::CAPACITY),
        }
    }

    /// Append `slot`; refused when full or already buffered.
    pub fn push(&mut self, slot: usize) -> bool {
        if self.is_full() || self.contains(slot) {
            return false;
        }
        self.slots.push(slot);
        true
    }

    /// Whether `slot` is already selected.
    pub fn contains(&self, slot: usize) -> bool {
        self.slots.contains(&slot)
    }

    /// Whether two cards are waiting for resolution.
    pub fn is_full(&self) -> bool {
        self.slots.len() >= Self::CAPACITY
    }

    /// Number of selected slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Selected slots in flip order.
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// Forget the selection.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Read/write view over a dealt deck plus per-card state.
#[derive(Debug, Clone)]
pub struct CardGrid {
    difficulty: Difficulty,
    cards: Vec<Card>,
}

impl CardGrid {
    /// Lay out a dealt deck, every card face-down.
    pub fn new(deck: Deck) -> Self {
        Self {
            difficulty: deck.difficulty(),
            cards: deck.into_cards(),
        }
    }

    /// Grid width for the deck's difficulty.
    pub fn columns(&self) -> usize {
        self.difficulty.columns()
    }

    /// All cards in slot order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the grid holds no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Card at `slot`.
    pub fn card(&self, slot: usize) -> Result<&Card, GridError> {
        self.cards.get(slot).ok_or(GridError::InvalidSlot {
            slot,
            len: self.cards.len(),
        })
    }

    fn card_mut(&mut self, slot: usize) -> Result<&mut Card, GridError> {
        let len = self.cards.len();
        self.cards
            .get_mut(slot)
            .ok_or(GridError::InvalidSlot { slot, len })
    }

    /// Turn a face-down card up. Returns `false` when the card was already
    /// face-up or matched.
    pub fn flip(&mut self, slot: usize) -> Result<bool, GridError> {
        let card = self.card_mut(slot)?;
        if card.state != CardState::FaceDown {
            return Ok(false);
        }
        card.state = CardState::FaceUp;
        Ok(true)
    }

    /// Compare the two buffered cards. Matching cards become [`CardState::Matched`];
    /// mismatching cards stay face-up until the caller hides them.
    pub fn resolve_match(&mut self, selection: &SelectionBuffer) -> Result<MatchOutcome, GridError> {
        let [first, second] = selection.slots() else {
            return Err(GridError::Precondition {
                selected: selection.len(),
            });
        };
        let (first, second) = (*first, *second);

        if self.card(first)?.face_id != self.card(second)?.face_id {
            return Ok(MatchOutcome::Mismatch);
        }

        self.card_mut(first)?.state = CardState::Matched;
        self.card_mut(second)?.state = CardState::Matched;
        Ok(MatchOutcome::Matched)
    }

    /// Turn the given cards back face-down, leaving matched cards untouched.
    pub fn hide(&mut self, slots: &[usize]) -> Result<(), GridError> {
        for &slot in slots {
            let card = self.card_mut(slot)?;
            if card.state == CardState::FaceUp {
                card.state = CardState::FaceDown;
            }
        }
        Ok(())
    }

    /// Show every unmatched card (preview).
    pub fn reveal_all(&mut self) {
        for card in &mut self.cards {
            if card.state == CardState::FaceDown {
                card.state = CardState::FaceUp;
            }
        }
    }

    /// Turn every non-matched card face-down again.
    pub fn hide_unmatched(&mut self) {
        for card in &mut self.cards {
            if card.state == CardState::FaceUp {
                card.state = CardState::FaceDown;
            }
        }
    }

    /// Cards in the Matched state.
    pub fn matched_cards(&self) -> usize {
        self.cards
            .iter()
            .filter(|card| card.state == CardState::Matched)
            .count()
    }

    /// Matched cards divided by two.
    pub fn matched_pairs(&self) -> usize {
        self.matched_cards() / 2
    }

    /// Whether every card is matched.
    pub fn is_complete(&self) -> bool {
        !self.cards.is_empty() && self.matched_cards() == self.cards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::deck::{DeckSource, FixedDeck};

    fn easy_grid() -> CardGrid {
        let mut dealer = FixedDeck::new(vec![3, 3, 1, 2, 1, 2, 4, 4, 5, 5, 6, 6]);
        CardGrid::new(dealer.build(Difficulty::Easy, 15).unwrap())
    }

    fn select(slots: &[usize]) -> SelectionBuffer {
        let mut buffer = SelectionBuffer::new();
        for &slot in slots {
            buffer.push(slot);
        }
        buffer
    }

    #[test]
    fn flip_turns_face_down_cards_only() {
        let mut grid = easy_grid();
        assert_eq!(grid.flip(0), Ok(true));
        assert_eq!(grid.flip(0), Ok(false));
        assert_eq!(grid.card(0).unwrap().state, CardState::FaceUp);
    }

    #[test]
    fn flip_out_of_range_is_an_error() {
        let mut grid = easy_grid();
        assert_eq!(grid.flip(12), Err(GridError::InvalidSlot { slot: 12, len: 12 }));
    }

    #[test]
    fn matching_pair_becomes_matched() {
        let mut grid = easy_grid();
        grid.flip(0).unwrap();
        grid.flip(1).unwrap();
        let selection = select(&[0, 1]);

        assert_eq!(grid.resolve_match(&selection), Ok(MatchOutcome::Matched));
        assert_eq!(grid.matched_pairs(), 1);
        // Matched cards cannot be flipped again.
        assert_eq!(grid.flip(0), Ok(false));
        // Resolving the same pair twice is harmless.
        assert_eq!(grid.resolve_match(&selection), Ok(MatchOutcome::Matched));
        assert_eq!(grid.matched_pairs(), 1);
    }

    #[test]
    fn mismatch_leaves_cards_for_caller_to_hide() {
        let mut grid = easy_grid();
        grid.flip(2).unwrap();
        grid.flip(3).unwrap();
        let selection = select(&[2, 3]);

        assert_eq!(grid.resolve_match(&selection), Ok(MatchOutcome::Mismatch));
        assert_eq!(grid.card(2).unwrap().state, CardState::FaceUp);
        grid.hide(selection.slots()).unwrap();
        assert_eq!(grid.card(2).unwrap().state, CardState::FaceDown);
        assert_eq!(grid.card(3).unwrap().state, CardState::FaceDown);
    }

    #[test]
    fn resolution_requires_two_selected_cards() {
        let mut grid = easy_grid();
        assert_eq!(
            grid.resolve_match(&select(&[0])),
            Err(GridError::Precondition { selected: 1 })
        );
    }

    #[test]
    fn selection_buffer_holds_two_distinct_slots() {
        let mut buffer = SelectionBuffer::new();
        assert!(buffer.push(4));
        assert!(!buffer.push(4));
        assert!(buffer.push(5));
        assert!(!buffer.push(6));
        assert_eq!(buffer.slots(), &[4, 5]);
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn complete_once_every_pair_is_matched() {
        let mut grid = easy_grid();
        for (a, b) in [(0, 1), (2, 4), (3, 5), (6, 7), (8, 9), (10, 11)] {
            assert!(!grid.is_complete());
            grid.flip(a).unwrap();
            grid.flip(b).unwrap();
            grid.resolve_match(&select(&[a, b])).unwrap();
        }
        assert!(grid.is_complete());
    }

    #[test]
    fn preview_reveal_and_hide_keep_matches() {
        let mut grid = easy_grid();
        grid.flip(0).unwrap();
        grid.flip(1).unwrap();
        grid.resolve_match(&select(&[0, 1])).unwrap();

        grid.reveal_all();
        assert!(grid.cards()[2..].iter().all(|card| card.state == CardState::FaceUp));
        grid.hide_unmatched();
        assert_eq!(grid.card(0).unwrap().state, CardState::Matched);
        assert!(grid.cards()[2..].iter().all(|card| card.state == CardState::FaceDown));
    }
}
