//! Deck construction: pick distinct faces, pair them up, shuffle.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::index};
use thiserror::Error;

use super::{
    difficulty::Difficulty,
    grid::{Card, CardState},
};

/// Failures raised while dealing a deck.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeckError {
    /// The face pool cannot cover the requested number of pairs.
    #[error("{difficulty} needs {required} distinct faces but only {available} are configured")]
    InsufficientFaces {
        /// Difficulty that was requested.
        difficulty: Difficulty,
        /// Distinct faces the difficulty needs.
        required: usize,
        /// Faces in the configured pool.
        available: u32,
    },
    /// A fixed layout does not fit the requested difficulty.
    #[error("layout has {actual} cards, {difficulty} expects {expected}")]
    LayoutMismatch {
        /// Difficulty that was requested.
        difficulty: Difficulty,
        /// Cards the difficulty needs.
        expected: usize,
        /// Cards in the layout.
        actual: usize,
    },
}

/// Immutable, dealt sequence of face-down cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    difficulty: Difficulty,
    cards: Vec<Card>,
}

impl Deck {
    /// Assign slot indices to `faces` in order.
    fn from_faces(difficulty: Difficulty, faces: Vec<u32>) -> Self {
        let cards = faces
            .into_iter()
            .enumerate()
            .map(|(slot, face_id)| Card {
                slot,
                face_id,
                state: CardState::FaceDown,
            })
            .collect();
        Self { difficulty, cards }
    }

    /// Difficulty the deck was dealt for.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Cards in slot order.
    #[cfg(test)]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Number of cards.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub(crate) fn into_cards(self) -> Vec<Card> {
        self.cards
    }
}

/// Anything able to deal a deck for a difficulty.
pub trait DeckSource: Send {
    /// Deal a deck of `2 * difficulty.pairs()` cards from faces `1..=total_faces`.
    fn build(&mut self, difficulty: Difficulty, total_faces: u32) -> Result<Deck, DeckError>;
}

/// Deals uniformly random decks from the face pool `[1, total_faces]`.
#[derive(Debug, Clone)]
pub struct RandomDeck<R = StdRng> {
    rng: R,
}

impl RandomDeck<StdRng> {
    /// Seed from the operating system.
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible dealer, used by tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> DeckSource for RandomDeck<R> {
    fn build(&mut self, difficulty: Difficulty, total_faces: u32) -> Result<Deck, DeckError> {
        build(&mut self.rng, difficulty, total_faces)
    }
}

/// Deal a shuffled deck of `2 * pairs` cards for `difficulty`.
pub fn build<R: Rng + ?Sized>(
    rng: &mut R,
    difficulty: Difficulty,
    total_faces: u32,
) -> Result<Deck, DeckError> {
    let required = difficulty.pairs();
    if (total_faces as usize) < required {
        return Err(DeckError::InsufficientFaces {
            difficulty,
            required,
            available: total_faces,
        });
    }

    let mut faces: Vec<u32> = index::sample(rng, total_faces as usize, required)
        .into_iter()
        .flat_map(|index| {
            let face_id = index as u32 + 1;
            [face_id, face_id]
        })
        .collect();
    fisher_yates(rng, &mut faces);

    Ok(Deck::from_faces(difficulty, faces))
}

/// In-place uniform permutation: walk from the last index down to 1 and swap
/// each element with a uniformly chosen index at or below it.
pub fn fisher_yates<T, R: Rng + ?Sized>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Deals a predetermined layout, for deterministic sessions.
#[derive(Debug, Clone)]
pub struct FixedDeck {
    faces: Vec<u32>,
}

impl FixedDeck {
    /// Dealer that always lays out `faces` in order.
    pub fn new(faces: Vec<u32>) -> Self {
        Self { faces }
    }
}

impl DeckSource for FixedDeck {
    fn build(&mut self, difficulty: Difficulty, total_faces: u32) -> Result<Deck, DeckError> {
        let expected = difficulty.pairs() * 2;
        if self.faces.len() != expected {
            return Err(DeckError::LayoutMismatch {
                difficulty,
                expected,
                actual: self.faces.len(),
            });
        }
        if (total_faces as usize) < difficulty.pairs() {
            return Err(DeckError::InsufficientFaces {
                difficulty,
                required: difficulty.pairs(),
                available: total_faces,
            });
        }
        Ok(Deck::from_faces(difficulty, self.faces.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn face_counts(deck: &Deck) -> HashMap<u32, usize> {
        let mut counts = HashMap::new();
        for card in deck.cards() {
            *counts.entry(card.face_id).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn every_face_appears_exactly_twice() {
        for difficulty in Difficulty::ALL {
            for seed in 0..20 {
                let mut rng = StdRng::seed_from_u64(seed);
                let deck = build(&mut rng, difficulty, 15).unwrap();

                assert_eq!(deck.len(), difficulty.pairs() * 2);
                assert_eq!(deck.len() % 2, 0);
                let counts = face_counts(&deck);
                assert_eq!(counts.len(), difficulty.pairs());
                assert!(counts.values().all(|count| *count == 2));
                assert!(counts.keys().all(|face| (1..=15).contains(face)));
            }
        }
    }

    #[test]
    fn slots_follow_final_order() {
        let mut dealer = RandomDeck::seeded(7);
        let deck = dealer.build(Difficulty::Normal, 12).unwrap();
        for (position, card) in deck.cards().iter().enumerate() {
            assert_eq!(card.slot, position);
            assert_eq!(card.state, CardState::FaceDown);
        }
    }

    #[test]
    fn small_face_pool_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = build(&mut rng, Difficulty::Hard, 10).unwrap_err();
        assert_eq!(
            err,
            DeckError::InsufficientFaces {
                difficulty: Difficulty::Hard,
                required: 15,
                available: 10,
            }
        );
    }

    #[test]
    fn exact_face_pool_uses_every_face() {
        let mut rng = StdRng::seed_from_u64(3);
        let deck = build(&mut rng, Difficulty::Easy, 6).unwrap();
        let mut faces: Vec<u32> = face_counts(&deck).into_keys().collect();
        faces.sort_unstable();
        assert_eq!(faces, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn shuffle_positions_are_roughly_uniform() {
        const RUNS: usize = 30_000;
        const LEN: usize = 6;
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = [[0usize; LEN]; LEN];

        for _ in 0..RUNS {
            let mut items: Vec<usize> = (0..LEN).collect();
            fisher_yates(&mut rng, &mut items);
            for (position, value) in items.into_iter().enumerate() {
                hits[position][value] += 1;
            }
        }

        let expected = (RUNS / LEN) as f64;
        for row in hits {
            for count in row {
                let deviation = (count as f64 - expected).abs() / expected;
                assert!(deviation < 0.08, "count {count} deviates from {expected}");
            }
        }
    }

    #[test]
    fn fixed_layout_must_fit_difficulty() {
        let mut dealer = FixedDeck::new(vec![1, 1, 2, 2]);
        let err = dealer.build(Difficulty::Easy, 15).unwrap_err();
        assert!(matches!(err, DeckError::LayoutMismatch { expected: 12, actual: 4, .. }));
    }
}
