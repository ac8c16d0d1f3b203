//! Time source for history timestamps.

use chrono::{DateTime, Utc};

/// Supplies the timestamp stamped on each appended entry. Timestamps are
/// informational only; projection never reads them.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
