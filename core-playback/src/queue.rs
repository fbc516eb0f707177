//! # Queue & Shuffle Engine
//!
//! Sequence, position, seeded shuffle order and repeat mode.
//!
//! Shuffle order is a permutation of every queue position with the current
//! position first, followed by a Fisher–Yates shuffle of the remaining
//! positions driven by [`StdRng`] seeded from `shuffle_seed`. The same seed
//! and queue length always produce the same order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};
use crate::types::{RepeatMode, Track};

/// Queue state owned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    sequence: Vec<Track>,
    index: usize,
    shuffle_order: Option<Vec<usize>>,
    shuffle_seed: u64,
    repeat_mode: RepeatMode,
}

impl Default for QueueState {
    fn default() -> Self {
        Self::with_seed(rand::random())
    }
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty queue with a fixed shuffle seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            sequence: Vec::new(),
            index: 0,
            shuffle_order: None,
            shuffle_seed: seed,
            repeat_mode: RepeatMode::Off,
        }
    }

    /// Replaces the sequence and position.
    ///
    /// An active shuffle is regenerated for the new queue.
    pub fn set_queue(&mut self, tracks: Vec<Track>, index: usize) -> Result<()> {
        if !tracks.is_empty() && index >= tracks.len() {
            return Err(PlaybackError::InvalidIndex {
                index,
                len: tracks.len(),
            });
        }

        self.sequence = tracks;
        self.index = if self.sequence.is_empty() { 0 } else { index };
        if self.shuffle_order.is_some() {
            self.shuffle_order = Some(self.generate_order());
        }
        Ok(())
    }

    pub fn tracks(&self) -> &[Track] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Current position, `None` for an empty queue.
    pub fn index(&self) -> Option<usize> {
        (!self.sequence.is_empty()).then_some(self.index)
    }

    pub fn current(&self) -> Option<&Track> {
        self.sequence.get(self.index)
    }

    pub fn position_of(&self, track_id: &str) -> Option<usize> {
        self.sequence.iter().position(|t| t.id == track_id)
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle_order.is_some()
    }

    pub fn shuffle_order(&self) -> Option<&[usize]> {
        self.shuffle_order.as_deref()
    }

    pub fn shuffle_seed(&self) -> u64 {
        self.shuffle_seed
    }

    /// Sets the shuffle seed. An active shuffle is regenerated from the
    /// current track so the new seed takes effect immediately.
    pub fn set_shuffle_seed(&mut self, seed: u64) {
        self.shuffle_seed = seed;
        if self.is_shuffled() {
            self.shuffle_order = Some(self.generate_order());
        }
    }

    /// Turns shuffle on (generating a fresh order) or off. Returns the new
    /// state.
    pub fn toggle_shuffle(&mut self) -> bool {
        if self.shuffle_order.take().is_none() {
            self.shuffle_order = Some(self.generate_order());
        }
        self.is_shuffled()
    }

    /// Position that `next()` would move to.
    pub fn peek_next(&self) -> Option<usize> {
        let order = self.order();
        let cursor = self.cursor(&order)?;
        match order.get(cursor + 1) {
            Some(&next) => Some(next),
            None if self.repeat_mode == RepeatMode::All => order.first().copied(),
            None => None,
        }
    }

    /// Position that `previous()` would move to.
    pub fn peek_previous(&self) -> Option<usize> {
        let order = self.order();
        let cursor = self.cursor(&order)?;
        if cursor > 0 {
            return order.get(cursor - 1).copied();
        }
        match self.repeat_mode {
            RepeatMode::All => order.last().copied(),
            _ => None,
        }
    }

    /// Moves forward in play order. `None` (and no move) at the end of a
    /// queue that does not repeat.
    pub fn next(&mut self) -> Option<usize> {
        let next = self.peek_next()?;
        self.index = next;
        Some(next)
    }

    /// Moves backward in play order. `None` (and no move) at the start of a
    /// queue that does not repeat.
    pub fn previous(&mut self) -> Option<usize> {
        let previous = self.peek_previous()?;
        self.index = previous;
        Some(previous)
    }

    /// The track `next()` would select, for preloading.
    pub fn upcoming(&self) -> Option<&Track> {
        self.peek_next().and_then(|i| self.sequence.get(i))
    }

    fn order(&self) -> Vec<usize> {
        match &self.shuffle_order {
            Some(order) => order.clone(),
            None => (0..self.sequence.len()).collect(),
        }
    }

    fn cursor(&self, order: &[usize]) -> Option<usize> {
        order.iter().position(|&i| i == self.index)
    }

    fn generate_order(&self) -> Vec<usize> {
        if self.sequence.is_empty() {
            return Vec::new();
        }
        let mut rest: Vec<usize> = (0..self.sequence.len())
            .filter(|&i| i != self.index)
            .collect();
        fisher_yates(&mut rest, self.shuffle_seed);

        let mut order = Vec::with_capacity(self.sequence.len());
        order.push(self.index);
        order.extend(rest);
        order
    }
}

/// In-place Fisher–Yates: walk from the last slot down, swapping each with a
/// uniformly drawn slot at or before it.
fn fisher_yates(items: &mut [usize], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}
