//! Wall-clock sources.

use crate::Time;
use chrono::Utc;

/// Supplies the current time to constructors and setters.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Time;

    /// Current calendar date.
    fn today(&self) -> chrono::NaiveDate {
        self.now().date_naive()
    }
}

/// Real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant, for tests and replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Time);

impl FixedClock {
    /// Freeze the clock at `time`.
    pub fn new(time: Time) -> Self {
        Self(time)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Time {
        self.0
    }
}
