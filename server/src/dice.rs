//! Randomness sources for dice rolls and card draws.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

pub trait Dice: Send {
    /// One fair six-sided die, `1..=6`.
    fn roll_die(&mut self) -> u8;

    /// Index of the card drawn from a deck of `deck_len` cards.
    fn draw(&mut self, deck_len: usize) -> usize;

    fn roll_pair(&mut self) -> (u8, u8) {
        (self.roll_die(), self.roll_die())
    }
}

pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl Dice for RandomDice {
    fn roll_die(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }

    fn draw(&mut self, deck_len: usize) -> usize {
        self.rng.gen_range(0..deck_len.max(1))
    }
}

/// Replays queued dice faces and card indices, for deterministic games.
///
/// Once a queue runs dry the die falls back to 1 and the draw to card 0.
#[derive(Debug, Default, Clone)]
pub struct ScriptedDice {
    faces: VecDeque<u8>,
    cards: VecDeque<usize>,
}

impl ScriptedDice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rolls(rolls: &[(u8, u8)]) -> Self {
        let mut dice = Self::new();
        for &(a, b) in rolls {
            dice.push_roll(a, b);
        }
        dice
    }

    pub fn push_roll(&mut self, a: u8, b: u8) {
        self.faces.push_back(a);
        self.faces.push_back(b);
    }

    pub fn push_card(&mut self, index: usize) {
        self.cards.push_back(index);
    }
}

impl Dice for ScriptedDice {
    fn roll_die(&mut self) -> u8 {
        self.faces.pop_front().unwrap_or(1)
    }

    fn draw(&mut self, deck_len: usize) -> usize {
        self.cards.pop_front().unwrap_or(0) % deck_len.max(1)
    }
}
