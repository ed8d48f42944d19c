//! Uniform draws for the random LoRA stack

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::VecDeque;

/// Source of uniform values in `[0, 1)`
pub trait DrawSource: Send {
    fn next_draw(&mut self) -> f64;
}

/// Draws backed by a `rand` generator
pub struct RngDraws<R> {
    rng: R,
}

impl RngDraws<StdRng> {
    /// Generator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: RngCore + Send> RngDraws<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore + Send> DrawSource for RngDraws<R> {
    fn next_draw(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of draws, then repeats the last one.
/// An empty list always draws `0.0`.
#[derive(Debug, Clone, Default)]
pub struct SequenceDraws {
    values: VecDeque<f64>,
    last: f64,
    taken: usize,
}

impl SequenceDraws {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            last: 0.0,
            taken: 0,
        }
    }

    /// Number of draws handed out so far
    pub fn taken(&self) -> usize {
        self.taken
    }
}

impl DrawSource for SequenceDraws {
    fn next_draw(&mut self) -> f64 {
        self.taken += 1;
        if let Some(v) = self.values.pop_front() {
            self.last = v;
        }
        self.last
    }
}
