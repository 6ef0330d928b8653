use std::time::Duration;

/// Shortest period a timer may have; keeps catch-up loops finite.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Opaque id of a registered periodic timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Which component a timer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Scroll,
    Stats,
    Countdown,
}

/// One firing of a periodic timer, stamped with its logical deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFiring {
    pub handle: TimerHandle,
    pub kind: TimerKind,
    pub at: Duration,
}

/// Registration side of a timer facility.
///
/// Components only ever see this trait; who drives the timers (a real event
/// loop or a test advancing simulated time) is up to the owner.
pub trait Scheduler {
    fn register_periodic(&mut self, interval: Duration, kind: TimerKind) -> TimerHandle;
    /// Returns false if the handle is not registered.
    fn set_interval(&mut self, handle: TimerHandle, interval: Duration) -> bool;
    /// Returns false if the handle was already cancelled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}

#[derive(Debug, Clone)]
struct Entry {
    handle: TimerHandle,
    kind: TimerKind,
    interval: Duration,
    last_fired: Duration,
    next_due: Duration,
}

/// Deterministic timer queue advanced by explicit time readings
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: Vec<Entry>,
    next_id: u64,
    now: Duration,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves logical time forward; registrations are anchored to it.
    /// Time never goes backwards.
    pub fn set_now(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Pops the earliest firing due at or before `now` and reschedules its
    /// timer one interval after that deadline. Call repeatedly until `None`.
    pub fn next_due(&mut self, now: Duration) -> Option<TimerFiring> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.next_due <= now)
            .min_by_key(|(_, e)| (e.next_due, e.handle))
            .map(|(i, _)| i)?;

        let entry = &mut self.entries[idx];
        let at = entry.next_due;
        entry.last_fired = at;
        entry.next_due = at + entry.interval;
        let firing = TimerFiring {
            handle: entry.handle,
            kind: entry.kind,
            at,
        };
        self.set_now(at);

        Some(firing)
    }

    pub fn is_registered(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Scheduler for TimerQueue {
    fn register_periodic(&mut self, interval: Duration, kind: TimerKind) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        let interval = interval.max(MIN_INTERVAL);
        self.entries.push(Entry {
            handle,
            kind,
            interval,
            last_fired: self.now,
            next_due: self.now + interval,
        });
        handle
    }

    fn set_interval(&mut self, handle: TimerHandle, interval: Duration) -> bool {
        match self.entries.iter_mut().find(|e| e.handle == handle) {
            Some(entry) => {
                entry.interval = interval.max(MIN_INTERVAL);
                entry.next_due = entry.last_fired + entry.interval;
                true
            }
            None => false,
        }
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockState {
    Stopped,
    Running {
        handle: TimerHandle,
        interval: Duration,
    },
}

/// A repeating clock owned by one component.
///
/// Holds at most one registration; `stop` is idempotent.
#[derive(Debug, Clone)]
pub struct ScrollClock {
    kind: TimerKind,
    state: ClockState,
}

impl ScrollClock {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            state: ClockState::Stopped,
        }
    }

    /// Starts firing every `interval`. A running clock is restarted.
    pub fn start(&mut self, scheduler: &mut dyn Scheduler, interval: Duration) {
        self.stop(scheduler);
        let handle = scheduler.register_periodic(interval, self.kind);
        self.state = ClockState::Running { handle, interval };
    }

    /// Changes the period of a running clock; the next fire is one new
    /// interval after the previous one. Returns false when stopped.
    pub fn set_interval(&mut self, scheduler: &mut dyn Scheduler, interval: Duration) -> bool {
        match self.state {
            ClockState::Running { handle, .. } => {
                scheduler.set_interval(handle, interval);
                self.state = ClockState::Running { handle, interval };
                true
            }
            ClockState::Stopped => false,
        }
    }

    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        if let ClockState::Running { handle, .. } = self.state {
            scheduler.cancel(handle);
            self.state = ClockState::Stopped;
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ClockState::Running { .. })
    }

    pub fn interval(&self) -> Option<Duration> {
        match self.state {
            ClockState::Running { interval, .. } => Some(interval),
            ClockState::Stopped => None,
        }
    }

    /// True if `handle` is this clock's live registration
    pub fn owns(&self, handle: TimerHandle) -> bool {
        matches!(self.state, ClockState::Running { handle: h, .. } if h == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut TimerQueue, now: Duration) -> Vec<TimerFiring> {
        std::iter::from_fn(|| queue.next_due(now)).collect()
    }

    #[test]
    fn fires_every_interval_with_catch_up() {
        let mut q = TimerQueue::new();
        q.register_periodic(Duration::from_millis(50), TimerKind::Scroll);

        assert!(drain(&mut q, Duration::from_millis(49)).is_empty());
        let fired = drain(&mut q, Duration::from_millis(200));
        let at: Vec<u64> = fired.iter().map(|f| f.at.as_millis() as u64).collect();
        assert_eq!(at, vec![50, 100, 150, 200]);
    }

    #[test]
    fn firings_interleave_in_time_order() {
        let mut q = TimerQueue::new();
        q.register_periodic(Duration::from_millis(300), TimerKind::Stats);
        q.register_periodic(Duration::from_millis(200), TimerKind::Scroll);

        let kinds: Vec<TimerKind> = drain(&mut q, Duration::from_millis(600))
            .into_iter()
            .map(|f| f.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TimerKind::Scroll,
                TimerKind::Stats,
                TimerKind::Scroll,
                TimerKind::Stats,
                TimerKind::Scroll,
            ]
        );
    }

    #[test]
    fn set_interval_applies_from_last_fire() {
        let mut q = TimerQueue::new();
        let h = q.register_periodic(Duration::from_millis(100), TimerKind::Scroll);
        assert_eq!(drain(&mut q, Duration::from_millis(100)).len(), 1);

        assert!(q.set_interval(h, Duration::from_millis(30)));
        let at: Vec<u64> = drain(&mut q, Duration::from_millis(190))
            .iter()
            .map(|f| f.at.as_millis() as u64)
            .collect();
        assert_eq!(at, vec![130, 160, 190]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut q = TimerQueue::new();
        let h = q.register_periodic(Duration::from_millis(10), TimerKind::Countdown);
        assert!(q.cancel(h));
        assert!(!q.cancel(h));
        assert!(q.is_empty());
        assert!(drain(&mut q, Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn zero_interval_is_bumped_to_minimum() {
        let mut q = TimerQueue::new();
        q.register_periodic(Duration::ZERO, TimerKind::Scroll);
        assert_eq!(drain(&mut q, Duration::from_millis(3)).len(), 3);
    }

    #[test]
    fn scroll_clock_stop_twice_is_noop() {
        let mut q = TimerQueue::new();
        let mut clock = ScrollClock::new(TimerKind::Scroll);
        clock.stop(&mut q);
        clock.start(&mut q, Duration::from_millis(50));
        assert!(clock.is_running());
        assert_eq!(q.len(), 1);
        clock.stop(&mut q);
        clock.stop(&mut q);
        assert!(!clock.is_running());
        assert!(q.is_empty());
    }

    #[test]
    fn scroll_clock_restart_replaces_registration() {
        let mut q = TimerQueue::new();
        let mut clock = ScrollClock::new(TimerKind::Stats);
        clock.start(&mut q, Duration::from_millis(50));
        clock.start(&mut q, Duration::from_millis(80));
        assert_eq!(q.len(), 1);
        assert_eq!(clock.interval(), Some(Duration::from_millis(80)));

        let firing = q.next_due(Duration::from_millis(80)).unwrap();
        assert!(clock.owns(firing.handle));
    }

    #[test]
    fn scroll_clock_set_interval_requires_running() {
        let mut q = TimerQueue::new();
        let mut clock = ScrollClock::new(TimerKind::Scroll);
        assert!(!clock.set_interval(&mut q, Duration::from_millis(20)));
        clock.start(&mut q, Duration::from_millis(50));
        assert!(clock.set_interval(&mut q, Duration::from_millis(20)));
        assert_eq!(clock.interval(), Some(Duration::from_millis(20)));
    }
}
