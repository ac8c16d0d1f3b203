//! Random number generator abstraction for determinism.
//!
//! Only setup uses randomness (dealing roles to seats). Production code
//! injects [`SeededRng`]; tests inject a recorded sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the random draws used when dealing roles.
pub trait DeterministicRng: Send + Sync {
    /// Draws a `u32` in `[min, max]`, both ends included.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;
}

/// `StdRng`-backed generator. The same seed always deals the same grimoire.
#[derive(Debug, Clone)]
pub struct SeededRng(StdRng);

impl SeededRng {
    /// Creates a generator from a fixed seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl DeterministicRng for SeededRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.0.random_range(min..=max)
    }
}
