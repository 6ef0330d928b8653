use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

/// Source of time for the session.
///
/// `now` is monotonic and only meaningful relative to other readings of the
/// same clock. `wall_time` is used for naming recordings.
pub trait Clock {
    fn now(&self) -> Duration;

    fn wall_time(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Production clock backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for deterministic tests.
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to the controller.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    wall_origin: DateTime<Local>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::with_wall_origin(Local::now())
    }

    pub fn with_wall_origin(wall_origin: DateTime<Local>) -> Self {
        Self {
            now: Rc::new(Cell::new(Duration::ZERO)),
            wall_origin,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn wall_time(&self) -> DateTime<Local> {
        let offset = chrono::Duration::from_std(self.now.get())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_origin + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance_ms(250);
        assert_eq!(other.now(), Duration::from_millis(250));
    }

    #[test]
    fn manual_wall_time_follows_advance() {
        let origin = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let clock = ManualClock::with_wall_origin(origin);
        clock.advance(Duration::from_secs(61));
        assert_eq!(clock.wall_time().format("%H%M%S").to_string(), "140601");
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
