//! Frozen clock for tests.

use chrono::{DateTime, Utc};
use grimoire_core::clock::Clock;

/// Stamps every entry with the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
