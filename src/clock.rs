//! Time source abstraction.
//!
//! Due dates and overdue fines depend on the calendar, so operations read
//! the current instant through a [`Clock`] instead of calling `Utc::now()`
//! directly. Tests and batch replays pin the calendar with [`ManualClock`].

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// A source of the current instant.
///
/// Each engine operation reads the clock exactly once, at the start of its
/// transaction.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: DateTime<Utc>,
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        ManualClock {
            start,
            current: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock();
        *current = *current + by;
    }

    /// Jumps to `days` whole days after the starting instant.
    pub fn jump_to_day(&self, days: i64) {
        *self.current.lock() = self.start + Duration::days(days);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_manual_clock_is_frozen() {
        let clock = ManualClock::starting_at(start());
        assert_eq!(clock.now(), start());
        assert_eq!(clock.now(), start());
    }

    #[test]
    fn test_advance_accumulates() {
        let clock = ManualClock::starting_at(start());
        clock.advance(Duration::days(2));
        clock.advance(Duration::hours(3));
        assert_eq!(clock.now(), start() + Duration::days(2) + Duration::hours(3));
    }

    #[test]
    fn test_jump_is_absolute_from_start() {
        let clock = ManualClock::starting_at(start());
        clock.advance(Duration::days(10));
        clock.jump_to_day(3);
        assert_eq!(clock.now(), start() + Duration::days(3));
    }
}
