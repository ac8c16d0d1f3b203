//! Scripted `DeterministicRng` doubles.

use grimoire_core::rng::DeterministicRng;

/// Always draws the lower bound, so dealing keeps the role list in order.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }
}

/// Replays a scripted list of draws, clamped into the requested range.
///
/// # Panics
///
/// Panics when asked for more draws than were scripted.
#[derive(Debug)]
pub struct SequenceRng {
    draws: std::vec::IntoIter<u32>,
}

impl SequenceRng {
    /// Scripts the draws returned, in order.
    #[must_use]
    pub fn new(draws: Vec<u32>) -> Self {
        Self {
            draws: draws.into_iter(),
        }
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let Some(draw) = self.draws.next() else {
            panic!("SequenceRng ran out of scripted draws");
        };
        draw.clamp(min, max.max(min))
    }
}
