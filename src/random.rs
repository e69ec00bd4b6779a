//! Injectable pseudo-random source
//!
//! Expression picks, motion picks and jitter lip sync all draw from a
//! `RandomSource` handed to the drive loop, so replays and tests can supply a
//! deterministic generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniform values in `[0, 1)`
pub trait RandomSource {
    /// Next uniform value in `[0, 1)`
    fn next_f32(&mut self) -> f32;

    /// Uniform index in `0..len`, `None` when `len` is zero
    fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let index = (self.next_f32() * len as f32) as usize;
        Some(index.min(len - 1))
    }
}

impl RandomSource for StdRng {
    fn next_f32(&mut self) -> f32 {
        self.random::<f32>()
    }
}

/// Seeded generator, or an OS-seeded one when `seed` is `None`
pub fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Replays a fixed list of values in a loop
#[derive(Debug, Clone)]
pub struct FixedSequence {
    values: Vec<f32>,
    cursor: usize,
}

impl FixedSequence {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, cursor: 0 }
    }
}

impl RandomSource for FixedSequence {
    fn next_f32(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value.clamp(0.0, 0.999_999)
    }
}
