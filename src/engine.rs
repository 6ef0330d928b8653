use serde::Serialize;
use std::time::Duration;

use crate::config::PrompterConfig;
use crate::scheduler::{ScrollClock, Scheduler, TimerHandle, TimerKind};

/// User-chosen scroll rate, always inside the configured range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScrollSpeed(u32);

impl ScrollSpeed {
    /// Out-of-range values are clamped, never rejected
    pub fn new(value: i64, config: &PrompterConfig) -> Self {
        Self(config.clamp_speed(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ScrollSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wall-time span of the current or last scroll session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSpan {
    NotStarted,
    Running { since: Duration },
    Stopped { since: Duration, until: Duration },
}

impl SessionSpan {
    pub fn elapsed(&self, now: Duration) -> Duration {
        match *self {
            SessionSpan::NotStarted => Duration::ZERO,
            SessionSpan::Running { since } => now.saturating_sub(since),
            SessionSpan::Stopped { since, until } => until.saturating_sub(since),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    PositionChanged(f64),
    EndOfDocument,
}

/// Owns the scroll position and advances it on every clock tick.
///
/// Position is a fraction of the scrollable extent. It only moves forward
/// while running and only `reset` brings it back to zero.
#[derive(Debug)]
pub struct ScrollEngine {
    position: f64,
    speed: ScrollSpeed,
    extent: f64,
    span: SessionSpan,
    clock: ScrollClock,
    tick: Duration,
    calibration: f64,
    config: PrompterConfig,
}

impl ScrollEngine {
    pub fn new(config: &PrompterConfig) -> Self {
        Self {
            position: 0.0,
            speed: ScrollSpeed::new(config.default_speed as i64, config),
            extent: 0.0,
            span: SessionSpan::NotStarted,
            clock: ScrollClock::new(TimerKind::Scroll),
            tick: config.scroll_tick(),
            calibration: config.speed_calibration,
            config: config.clone(),
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn speed(&self) -> ScrollSpeed {
        self.speed
    }

    pub fn extent(&self) -> f64 {
        self.extent
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn span(&self) -> SessionSpan {
        self.span
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        self.span.elapsed(now)
    }

    pub fn owns_timer(&self, handle: TimerHandle) -> bool {
        self.clock.owns(handle)
    }

    /// Begins a session. Content that cannot scroll completes immediately.
    pub fn start(&mut self, scheduler: &mut dyn Scheduler, now: Duration) -> Vec<EngineEvent> {
        if self.is_running() {
            return Vec::new();
        }

        // read to the end already; the finished span stands
        if self.position >= 1.0 {
            return vec![EngineEvent::EndOfDocument];
        }

        if self.extent <= 0.0 {
            self.position = 1.0;
            self.span = SessionSpan::Stopped {
                since: now,
                until: now,
            };
            tracing::info!(extent = self.extent, "scroll_session_completed_on_start");
            return vec![EngineEvent::PositionChanged(1.0), EngineEvent::EndOfDocument];
        }

        self.span = SessionSpan::Running { since: now };
        self.clock.start(scheduler, self.tick);
        tracing::debug!(speed = self.speed.get(), position = self.position, "scroll_started");
        Vec::new()
    }

    /// Returns false if nothing was running
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler, now: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        self.clock.stop(scheduler);
        if let SessionSpan::Running { since } = self.span {
            self.span = SessionSpan::Stopped { since, until: now };
        }
        tracing::debug!(position = self.position, "scroll_stopped");
        true
    }

    pub fn on_tick(&mut self, scheduler: &mut dyn Scheduler, at: Duration) -> Vec<EngineEvent> {
        if !self.is_running() {
            return Vec::new();
        }

        let delta = self.speed.get() as f64 / self.calibration;
        let step = if self.extent > 0.0 {
            delta / self.extent
        } else {
            1.0
        };
        self.position = (self.position + step).min(1.0);

        let mut events = vec![EngineEvent::PositionChanged(self.position)];
        if self.position >= 1.0 {
            self.stop(scheduler, at);
            tracing::info!("end_of_document");
            events.push(EngineEvent::EndOfDocument);
        }
        events
    }

    /// Takes effect on the next tick; position is untouched
    pub fn set_speed(&mut self, value: i64) -> ScrollSpeed {
        self.speed = ScrollSpeed::new(value, &self.config);
        self.speed
    }

    /// Scrollable extent in display units; negative or NaN means none
    pub fn set_extent(&mut self, units: f64) {
        self.extent = if units.is_finite() && units > 0.0 {
            units
        } else {
            0.0
        };
    }

    pub fn set_tick_interval(&mut self, scheduler: &mut dyn Scheduler, interval: Duration) {
        self.tick = interval;
        self.clock.set_interval(scheduler, interval);
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// Back to the top. A running session restarts its clock at `now`.
    pub fn reset(&mut self, now: Duration) {
        self.position = 0.0;
        if self.is_running() {
            self.span = SessionSpan::Running { since: now };
        }
    }
}
