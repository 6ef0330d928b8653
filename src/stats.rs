use serde::Serialize;
use std::time::Duration;

use crate::config::PrompterConfig;
use crate::scheduler::{ScrollClock, Scheduler, TimerHandle, TimerKind};
use crate::time_series::{peak_wpm, wpm_spread, SessionSummary, WpmPoint};

/// Reading statistics at one sampling instant
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StatsSnapshot {
    pub progress_percent: f64,
    pub words_per_minute: f64,
    pub elapsed_seconds: f64,
    pub words_read: usize,
    pub total_words: usize,
    /// Time left at the measured pace, or at the default reading rate
    /// until a pace has been measured
    pub remaining_seconds: f64,
}

impl StatsSnapshot {
    /// Never fails: non-finite or negative inputs count as zero.
    pub fn compute(
        word_count: usize,
        position: f64,
        elapsed_seconds: f64,
        fallback_wpm: f64,
    ) -> Self {
        let position = if position.is_finite() {
            position.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let elapsed_seconds = if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
            elapsed_seconds
        } else {
            0.0
        };

        let words_read = (word_count as f64 * position).floor() as usize;
        let words_per_minute = if elapsed_seconds > 0.0 {
            (words_read as f64 / elapsed_seconds) * 60.0
        } else {
            0.0
        };

        let pace = if words_per_minute > 0.0 {
            words_per_minute
        } else {
            fallback_wpm
        };
        let words_left = word_count.saturating_sub(words_read) as f64;
        let remaining_seconds = if pace > 0.0 {
            words_left / pace * 60.0
        } else {
            0.0
        };

        Self {
            progress_percent: position * 100.0,
            words_per_minute,
            elapsed_seconds,
            words_read,
            total_words: word_count,
            remaining_seconds,
        }
    }
}

/// Samples progress on its own cadence, slower than the scroll tick, so the
/// WPM figure does not jitter.
#[derive(Debug)]
pub struct StatsTracker {
    word_count: usize,
    baseline_position: f64,
    clock: ScrollClock,
    refresh: Duration,
    fallback_wpm: f64,
    last: StatsSnapshot,
    history: Vec<WpmPoint>,
}

impl StatsTracker {
    pub fn new(config: &PrompterConfig) -> Self {
        Self {
            word_count: 0,
            baseline_position: 0.0,
            clock: ScrollClock::new(TimerKind::Stats),
            refresh: config.stats_refresh(),
            fallback_wpm: config.default_words_per_minute,
            last: StatsSnapshot::default(),
            history: Vec::new(),
        }
    }

    /// New document: forget everything measured so far
    pub fn load(&mut self, word_count: usize) {
        self.word_count = word_count;
        self.baseline_position = 0.0;
        self.history.clear();
        self.last = StatsSnapshot::compute(word_count, 0.0, 0.0, self.fallback_wpm);
    }

    pub fn start_tracking(
        &mut self,
        scheduler: &mut dyn Scheduler,
        word_count: usize,
        position: f64,
    ) {
        self.word_count = word_count;
        self.baseline_position = position;
        self.history.clear();
        self.clock.start(scheduler, self.refresh);
    }

    pub fn stop_tracking(&mut self, scheduler: &mut dyn Scheduler) {
        self.clock.stop(scheduler);
    }

    pub fn is_tracking(&self) -> bool {
        self.clock.is_running()
    }

    pub fn owns_timer(&self, handle: TimerHandle) -> bool {
        self.clock.owns(handle)
    }

    pub fn sample(&mut self, position: f64, elapsed_seconds: f64) -> StatsSnapshot {
        let snapshot =
            StatsSnapshot::compute(self.word_count, position, elapsed_seconds, self.fallback_wpm);
        if self.is_tracking() {
            self.history
                .push(WpmPoint::new(snapshot.elapsed_seconds, snapshot.words_per_minute));
        }
        self.last = snapshot;
        snapshot
    }

    pub fn last(&self) -> StatsSnapshot {
        self.last
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Words scrolled past since tracking started
    pub fn words_since_baseline(&self) -> usize {
        let base = (self.word_count as f64 * self.baseline_position).floor() as usize;
        self.last.words_read.saturating_sub(base)
    }

    pub fn history(&self) -> &[WpmPoint] {
        &self.history
    }

    pub fn summary(&self) -> SessionSummary {
        let (mean_wpm, wpm_std_dev) = wpm_spread(&self.history);
        SessionSummary {
            total_words: self.word_count,
            words_read: self.last.words_read,
            progress_percent: self.last.progress_percent,
            elapsed_seconds: self.last.elapsed_seconds,
            final_wpm: self.last.words_per_minute,
            mean_wpm,
            peak_wpm: peak_wpm(&self.history),
            wpm_std_dev,
            samples: self.history.len(),
            recording: None,
        }
    }
}
