//! Shared test doubles for the Grimoire rules engine.

mod clock;
mod repository;
mod rng;

pub use clock::FixedClock;
pub use repository::{
    EmptyGameRepository, FailingGameRepository, InMemoryGameRepository, RecordingGameRepository,
};
pub use rng::{MockRng, SequenceRng};
