use std::time::Duration;

use crate::config::PrompterConfig;
use crate::scheduler::{ScrollClock, Scheduler, TimerHandle, TimerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    Running { remaining_seconds: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick { remaining_seconds: u32 },
    Expired,
}

/// Rehearsal time-box, independent of the scroll position.
///
/// Expiry is reported once and the timer is immediately re-armable.
#[derive(Debug)]
pub struct CountdownTimer {
    state: CountdownState,
    clock: ScrollClock,
    tick: Duration,
    max_minutes: u32,
}

impl CountdownTimer {
    pub fn new(config: &PrompterConfig) -> Self {
        Self {
            state: CountdownState::Idle,
            clock: ScrollClock::new(TimerKind::Countdown),
            tick: config.countdown_tick(),
            max_minutes: config.max_countdown_minutes,
        }
    }

    /// Starts (or restarts) the countdown; returns the seconds armed
    pub fn arm(&mut self, scheduler: &mut dyn Scheduler, minutes: u32) -> u32 {
        let remaining_seconds = minutes.min(self.max_minutes) * 60;
        self.state = CountdownState::Running { remaining_seconds };
        self.clock.start(scheduler, self.tick);
        tracing::info!(remaining_seconds, "countdown_armed");
        remaining_seconds
    }

    pub fn on_tick(&mut self, scheduler: &mut dyn Scheduler) -> Option<CountdownEvent> {
        let CountdownState::Running { remaining_seconds } = self.state else {
            return None;
        };

        let remaining_seconds = remaining_seconds.saturating_sub(1);
        if remaining_seconds == 0 {
            self.clock.stop(scheduler);
            self.state = CountdownState::Idle;
            tracing::info!("countdown_expired");
            Some(CountdownEvent::Expired)
        } else {
            self.state = CountdownState::Running { remaining_seconds };
            Some(CountdownEvent::Tick { remaining_seconds })
        }
    }

    /// Returns false if nothing was running. Never reports expiry.
    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler) -> bool {
        self.clock.stop(scheduler);
        match self.state {
            CountdownState::Running { .. } => {
                self.state = CountdownState::Idle;
                true
            }
            CountdownState::Idle => false,
        }
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CountdownState::Running { .. })
    }

    pub fn remaining_seconds(&self) -> u32 {
        match self.state {
            CountdownState::Running { remaining_seconds } => remaining_seconds,
            CountdownState::Idle => 0,
        }
    }

    pub fn owns_timer(&self, handle: TimerHandle) -> bool {
        self.clock.owns(handle)
    }

    pub fn format_remaining(&self) -> String {
        format_mm_ss(self.remaining_seconds() as u64)
    }
}

/// `MM:SS`, minutes keep growing past 99
pub fn format_mm_ss(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TimerQueue;

    fn timer() -> (CountdownTimer, TimerQueue) {
        (
            CountdownTimer::new(&PrompterConfig::default()),
            TimerQueue::new(),
        )
    }

    #[test]
    fn one_minute_expires_exactly_on_tick_sixty() {
        let (mut cd, mut q) = timer();
        assert_eq!(cd.arm(&mut q, 1), 60);

        let mut expired_at = Vec::new();
        for n in 1..=60 {
            if cd.on_tick(&mut q) == Some(CountdownEvent::Expired) {
                expired_at.push(n);
            }
        }
        assert_eq!(expired_at, vec![60]);
        assert_eq!(cd.state(), CountdownState::Idle);
        assert!(q.is_empty());
        assert_eq!(cd.on_tick(&mut q), None);
    }

    #[test]
    fn ticks_report_remaining() {
        let (mut cd, mut q) = timer();
        cd.arm(&mut q, 2);
        assert_eq!(
            cd.on_tick(&mut q),
            Some(CountdownEvent::Tick {
                remaining_seconds: 119
            })
        );
        assert_eq!(cd.format_remaining(), "01:59");
    }

    #[test]
    fn cancel_never_expires_and_is_idempotent() {
        let (mut cd, mut q) = timer();
        assert!(!cd.cancel(&mut q));
        cd.arm(&mut q, 1);
        cd.on_tick(&mut q);
        assert!(cd.cancel(&mut q));
        assert!(!cd.cancel(&mut q));
        assert_eq!(cd.state(), CountdownState::Idle);
        assert_eq!(cd.on_tick(&mut q), None);
        assert!(q.is_empty());
    }

    #[test]
    fn rearm_after_expiry_and_while_running() {
        let (mut cd, mut q) = timer();
        cd.arm(&mut q, 0);
        assert_eq!(cd.on_tick(&mut q), Some(CountdownEvent::Expired));

        cd.arm(&mut q, 3);
        cd.on_tick(&mut q);
        cd.arm(&mut q, 1);
        assert_eq!(cd.remaining_seconds(), 60);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn minutes_are_capped() {
        let (mut cd, mut q) = timer();
        assert_eq!(cd.arm(&mut q, 500), 99 * 60);
    }

    #[test]
    fn mm_ss_formatting() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(65), "01:05");
        assert_eq!(format_mm_ss(6000), "100:00");
    }
}
