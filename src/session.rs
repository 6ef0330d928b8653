use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::PrompterConfig;
use crate::countdown::{CountdownEvent, CountdownState, CountdownTimer};
use crate::document::Document;
use crate::engine::{EngineEvent, ScrollEngine, ScrollSpeed};
use crate::error::{Error, Result};
use crate::recording::{recording_file_name, Recorder};
use crate::scheduler::{TimerFiring, TimerKind, TimerQueue};
use crate::stats::{StatsSnapshot, StatsTracker};
use crate::time_series::{SessionSummary, WpmPoint};

/// Screen edge the compact window docks to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DockPosition {
    Top,
    #[default]
    Bottom,
}

impl DockPosition {
    pub fn toggled(self) -> Self {
        match self {
            DockPosition::Top => DockPosition::Bottom,
            DockPosition::Bottom => DockPosition::Top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub dock: DockPosition,
    pub compact: bool,
    pub presentation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSession {
    pub active: bool,
    pub file_path: Option<PathBuf>,
}

/// What the recording status line shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingStatus {
    Ready,
    Recording(PathBuf),
    Saved(PathBuf),
    Unavailable(String),
}

/// Everything the display needs to redraw, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    DocumentLoaded { word_count: usize },
    PositionChanged(f64),
    EndOfDocument,
    ScrollingChanged(bool),
    SpeedChanged(ScrollSpeed),
    FontSizeChanged(u16),
    LayoutChanged(Layout),
    StatsUpdated(StatsSnapshot),
    CountdownTick { remaining_seconds: u32 },
    CountdownExpired,
    CountdownCancelled,
    RecordingStarted(PathBuf),
    RecordingSaved(PathBuf),
    RecordingUnavailable(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Viewport {
    total_lines: usize,
    visible_lines: usize,
}

/// Coordinates scrolling, statistics, the countdown and recording.
///
/// All timers are dispatched from [`SessionController::pump`] on the caller's
/// thread, so none of the state here needs locking. Operations never fail:
/// out-of-range values are clamped, stopping what is not running is a no-op
/// and recorder failures become a status instead of an error.
pub struct SessionController<C: Clock, R: Recorder> {
    config: PrompterConfig,
    clock: C,
    timers: TimerQueue,
    engine: ScrollEngine,
    stats: StatsTracker,
    countdown: CountdownTimer,
    recorder: R,
    recording: RecordingSession,
    recording_status: RecordingStatus,
    document: Document,
    font_size: u16,
    viewport: Viewport,
    layout: Layout,
    events: Vec<SessionEvent>,
}

impl<C: Clock, R: Recorder> SessionController<C, R> {
    pub fn new(config: PrompterConfig, clock: C, recorder: R) -> Self {
        let mut timers = TimerQueue::new();
        timers.set_now(clock.now());
        Self {
            engine: ScrollEngine::new(&config),
            stats: StatsTracker::new(&config),
            countdown: CountdownTimer::new(&config),
            font_size: config.clamp_font_size(config.default_font_size as i64),
            layout: Layout {
                dock: config.default_dock,
                compact: false,
                presentation: false,
            },
            config,
            clock,
            timers,
            recorder,
            recording: RecordingSession::default(),
            recording_status: RecordingStatus::Ready,
            document: Document::default(),
            viewport: Viewport::default(),
            events: Vec::new(),
        }
    }

    fn now(&mut self) -> Duration {
        let now = self.clock.now();
        self.timers.set_now(now);
        now
    }

    fn emit(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    /// Events produced since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // --- document & viewport ---

    /// Replaces the text. Position and statistics start over; speed, layout
    /// and an active recording are kept.
    pub fn load_document(&mut self, text: impl Into<String>) {
        let now = self.now();
        let document = Document::new(text);
        let word_count = document.word_count();
        tracing::info!(word_count, lines = document.line_count(), "document_loaded");

        self.viewport.total_lines = document.line_count();
        self.document = document;
        self.refresh_extent();

        self.engine.reset(now);
        self.stats.load(word_count);
        if self.engine.is_running() {
            self.stats
                .start_tracking(&mut self.timers, word_count, self.engine.position());
        }

        self.emit(SessionEvent::DocumentLoaded { word_count });
        self.emit(SessionEvent::PositionChanged(0.0));
        let snapshot = self.stats.last();
        self.emit(SessionEvent::StatsUpdated(snapshot));
    }

    /// Reported by the display after wrapping: all lines vs. lines on screen
    pub fn set_viewport(&mut self, total_lines: usize, visible_lines: usize) {
        let viewport = Viewport {
            total_lines,
            visible_lines,
        };
        if viewport != self.viewport {
            self.viewport = viewport;
            self.refresh_extent();
        }
    }

    fn refresh_extent(&mut self) {
        let hidden = self
            .viewport
            .total_lines
            .saturating_sub(self.viewport.visible_lines);
        let extent = hidden as f64 * self.config.line_height(self.font_size);
        self.engine.set_extent(extent);
    }

    // --- scrolling ---

    /// Returns whether scrolling is active afterwards. Text that fits the
    /// viewport completes at once.
    pub fn start_scrolling(&mut self) -> bool {
        if self.engine.is_running() {
            return true;
        }
        if self.engine.position() >= 1.0 {
            // nothing left to read; the finished session's numbers stand
            self.emit(SessionEvent::EndOfDocument);
            return false;
        }
        let now = self.now();
        let events = self.engine.start(&mut self.timers, now);
        if self.engine.is_running() {
            self.stats.start_tracking(
                &mut self.timers,
                self.document.word_count(),
                self.engine.position(),
            );
            tracing::info!(speed = %self.engine.speed(), "scrolling_started");
            self.emit(SessionEvent::ScrollingChanged(true));
        }
        self.apply_engine_events(events, now, false);
        self.engine.is_running()
    }

    /// Returns false if scrolling was not active
    pub fn stop_scrolling(&mut self) -> bool {
        let now = self.now();
        self.stop_scrolling_at(now)
    }

    fn stop_scrolling_at(&mut self, at: Duration) -> bool {
        if !self.engine.stop(&mut self.timers, at) {
            return false;
        }
        self.finish_sampling(at);
        tracing::info!(position = self.engine.position(), "scrolling_stopped");
        self.emit(SessionEvent::ScrollingChanged(false));
        true
    }

    pub fn toggle_scrolling(&mut self) -> bool {
        if self.engine.is_running() {
            self.stop_scrolling();
            false
        } else {
            self.start_scrolling()
        }
    }

    fn finish_sampling(&mut self, at: Duration) {
        let elapsed = self.engine.elapsed(at).as_secs_f64();
        let snapshot = self.stats.sample(self.engine.position(), elapsed);
        self.stats.stop_tracking(&mut self.timers);
        self.emit(SessionEvent::StatsUpdated(snapshot));
    }

    fn apply_engine_events(&mut self, events: Vec<EngineEvent>, at: Duration, was_running: bool) {
        for event in events {
            match event {
                EngineEvent::PositionChanged(p) => self.emit(SessionEvent::PositionChanged(p)),
                EngineEvent::EndOfDocument => {
                    self.finish_sampling(at);
                    self.emit(SessionEvent::EndOfDocument);
                    if was_running {
                        self.emit(SessionEvent::ScrollingChanged(false));
                    }
                }
            }
        }
    }

    pub fn set_speed(&mut self, value: i64) -> ScrollSpeed {
        let speed = self.engine.set_speed(value);
        self.emit(SessionEvent::SpeedChanged(speed));
        speed
    }

    pub fn adjust_speed(&mut self, delta: i64) -> ScrollSpeed {
        self.set_speed(self.engine.speed().get() as i64 + delta)
    }

    pub fn set_tick_interval(&mut self, interval: Duration) {
        self.now();
        self.engine.set_tick_interval(&mut self.timers, interval);
    }

    // --- presentation ---

    pub fn set_font_size(&mut self, size: i64) -> u16 {
        let size = self.config.clamp_font_size(size);
        if size != self.font_size {
            self.font_size = size;
            self.refresh_extent();
            self.emit(SessionEvent::FontSizeChanged(size));
        }
        size
    }

    pub fn increase_font(&mut self) -> u16 {
        self.set_font_size(self.font_size as i64 + self.config.font_size_step as i64)
    }

    pub fn decrease_font(&mut self) -> u16 {
        self.set_font_size(self.font_size as i64 - self.config.font_size_step as i64)
    }

    fn update_layout(&mut self, layout: Layout) {
        if layout != self.layout {
            self.layout = layout;
            self.emit(SessionEvent::LayoutChanged(layout));
        }
    }

    pub fn set_dock(&mut self, dock: DockPosition) {
        self.update_layout(Layout { dock, ..self.layout });
    }

    pub fn toggle_dock(&mut self) {
        self.set_dock(self.layout.dock.toggled());
    }

    pub fn toggle_compact(&mut self) {
        self.update_layout(Layout {
            compact: !self.layout.compact,
            ..self.layout
        });
    }

    pub fn set_presentation(&mut self, presentation: bool) {
        self.update_layout(Layout {
            presentation,
            ..self.layout
        });
    }

    pub fn toggle_presentation(&mut self) {
        self.set_presentation(!self.layout.presentation);
    }

    // --- recording ---

    /// Re-entrant calls return the active file without side effects.
    /// A failing recorder leaves scrolling and statistics untouched.
    pub fn start_recording(&mut self) -> Option<PathBuf> {
        if self.recording.active {
            return self.recording.file_path.clone();
        }
        let name = recording_file_name(self.clock.wall_time(), &self.config.recording_extension);
        let path = self.config.recordings_dir.join(name);

        match self.recorder.start(Some(path)) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "recording_started");
                self.recording = RecordingSession {
                    active: true,
                    file_path: Some(path.clone()),
                };
                self.recording_status = RecordingStatus::Recording(path.clone());
                self.emit(SessionEvent::RecordingStarted(path.clone()));
                Some(path)
            }
            Err(e) => {
                self.recording_unavailable(e);
                None
            }
        }
    }

    /// `None` when nothing was recording or the flush failed
    pub fn stop_recording(&mut self) -> Option<PathBuf> {
        if !self.recording.active {
            return None;
        }
        self.recording = RecordingSession::default();

        match self.recorder.stop() {
            Ok(Some(path)) => {
                self.recording_status = RecordingStatus::Saved(path.clone());
                self.emit(SessionEvent::RecordingSaved(path.clone()));
                Some(path)
            }
            Ok(None) => {
                self.recording_status = RecordingStatus::Ready;
                None
            }
            Err(e) => {
                self.recording_unavailable(e);
                None
            }
        }
    }

    pub fn toggle_recording(&mut self) -> Option<PathBuf> {
        if self.recording.active {
            self.stop_recording()
        } else {
            self.start_recording()
        }
    }

    fn recording_unavailable(&mut self, error: Error) {
        tracing::warn!(error = %error, "recording_unavailable");
        let message = error.to_string();
        self.recording_status = RecordingStatus::Unavailable(message.clone());
        self.emit(SessionEvent::RecordingUnavailable(message));
    }

    // --- countdown ---

    pub fn arm_countdown(&mut self, minutes: u32) -> u32 {
        self.now();
        let remaining_seconds = self.countdown.arm(&mut self.timers, minutes);
        self.emit(SessionEvent::CountdownTick { remaining_seconds });
        remaining_seconds
    }

    pub fn cancel_countdown(&mut self) -> bool {
        let cancelled = self.countdown.cancel(&mut self.timers);
        if cancelled {
            tracing::info!("countdown_cancelled");
            self.emit(SessionEvent::CountdownCancelled);
        }
        cancelled
    }

    // --- timers ---

    /// Runs every timer due by now, oldest first. Returns how many fired.
    pub fn pump(&mut self) -> usize {
        let now = self.now();
        let mut fired = 0;
        while let Some(firing) = self.timers.next_due(now) {
            fired += 1;
            if let Err(e) = self.on_timer(firing) {
                tracing::warn!(error = %e, kind = ?firing.kind, "timer_callback_failed");
            }
        }
        fired
    }

    fn on_timer(&mut self, firing: TimerFiring) -> Result<()> {
        let TimerFiring { handle, kind, at } = firing;
        match kind {
            TimerKind::Scroll if self.engine.owns_timer(handle) => {
                let events = self.engine.on_tick(&mut self.timers, at);
                self.apply_engine_events(events, at, true);
            }
            TimerKind::Stats if self.stats.owns_timer(handle) => {
                let elapsed = self.engine.elapsed(at).as_secs_f64();
                let snapshot = self.stats.sample(self.engine.position(), elapsed);
                self.emit(SessionEvent::StatsUpdated(snapshot));
            }
            TimerKind::Countdown if self.countdown.owns_timer(handle) => {
                match self.countdown.on_tick(&mut self.timers) {
                    Some(CountdownEvent::Tick { remaining_seconds }) => {
                        self.emit(SessionEvent::CountdownTick { remaining_seconds });
                    }
                    Some(CountdownEvent::Expired) => {
                        self.emit(SessionEvent::CountdownExpired);
                        self.stop_scrolling_at(at);
                    }
                    None => {}
                }
            }
            _ => return Err(Error::UnknownTimer(handle)),
        }
        Ok(())
    }

    /// Mandatory cleanup before the window goes away: an active recording
    /// is flushed to storage. Returns the saved file, if any.
    pub fn shutdown(&mut self) -> Option<PathBuf> {
        self.cancel_countdown();
        self.stop_scrolling();
        let saved = self.stop_recording();
        tracing::info!(saved = ?saved, "session_shutdown");
        saved
    }

    // --- queries ---

    pub fn config(&self) -> &PrompterConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn position(&self) -> f64 {
        self.engine.position()
    }

    pub fn speed(&self) -> ScrollSpeed {
        self.engine.speed()
    }

    pub fn extent(&self) -> f64 {
        self.engine.extent()
    }

    pub fn is_scrolling(&self) -> bool {
        self.engine.is_running()
    }

    pub fn elapsed(&self) -> Duration {
        self.engine.elapsed(self.clock.now())
    }

    pub fn font_size(&self) -> u16 {
        self.font_size
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.last()
    }

    pub fn wpm_history(&self) -> &[WpmPoint] {
        self.stats.history()
    }

    pub fn countdown_state(&self) -> CountdownState {
        self.countdown.state()
    }

    pub fn countdown_remaining(&self) -> String {
        self.countdown.format_remaining()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.active
    }

    pub fn recording_session(&self) -> &RecordingSession {
        &self.recording
    }

    pub fn recording_status(&self) -> &RecordingStatus {
        &self.recording_status
    }

    pub fn summary(&self) -> SessionSummary {
        let recording = match &self.recording_status {
            RecordingStatus::Recording(p) | RecordingStatus::Saved(p) => Some(p.clone()),
            RecordingStatus::Ready | RecordingStatus::Unavailable(_) => None,
        };
        SessionSummary {
            recording,
            ..self.stats.summary()
        }
    }
}

impl<C: Clock, R: Recorder> Drop for SessionController<C, R> {
    fn drop(&mut self) {
        if self.recording.active {
            tracing::warn!("flushing_recording_on_drop");
            self.stop_recording();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::recording::UnavailableRecorder;
    use crate::scheduler::Scheduler;
    use assert_matches::assert_matches;

    fn controller() -> (SessionController<ManualClock, UnavailableRecorder>, ManualClock) {
        let clock = ManualClock::new();
        let ctl = SessionController::new(
            PrompterConfig::default(),
            clock.clone(),
            UnavailableRecorder::new("no input device"),
        );
        (ctl, clock)
    }

    #[test]
    fn dock_toggles_and_displays_lowercase() {
        assert_eq!(DockPosition::Top.toggled(), DockPosition::Bottom);
        assert_eq!(DockPosition::Bottom.to_string(), "bottom");
    }

    #[test]
    fn extent_follows_viewport_and_font() {
        let (mut ctl, _) = controller();
        ctl.load_document("a\nb\nc\nd\ne\nf\ng\nh\ni\nj");
        ctl.set_viewport(10, 4);
        assert!((ctl.extent() - 6.0 * 24.0).abs() < 1e-9);

        ctl.set_font_size(30);
        assert!((ctl.extent() - 6.0 * 36.0).abs() < 1e-9);

        ctl.set_viewport(10, 12);
        assert_eq!(ctl.extent(), 0.0);
    }

    #[test]
    fn font_size_is_clamped_and_stepped() {
        let (mut ctl, _) = controller();
        assert_eq!(ctl.increase_font(), 22);
        assert_eq!(ctl.set_font_size(500), 72);
        assert_eq!(ctl.increase_font(), 72);
        assert_eq!(ctl.set_font_size(1), 12);
        assert_eq!(ctl.decrease_font(), 12);
    }

    #[test]
    fn layout_changes_are_published_once() {
        let (mut ctl, _) = controller();
        ctl.drain_events();
        ctl.toggle_compact();
        ctl.set_dock(DockPosition::Top);
        ctl.set_dock(DockPosition::Top);
        ctl.toggle_presentation();
        let layouts: Vec<_> = ctl
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::LayoutChanged(l) => Some(l),
                _ => None,
            })
            .collect();
        assert_eq!(layouts.len(), 3);
        assert_eq!(
            layouts[2],
            Layout {
                dock: DockPosition::Top,
                compact: true,
                presentation: true
            }
        );
    }

    #[test]
    fn stray_timer_is_logged_and_skipped() {
        let (mut ctl, clock) = controller();
        ctl.timers
            .register_periodic(Duration::from_millis(100), TimerKind::Scroll);
        clock.advance_ms(300);
        assert_eq!(ctl.pump(), 3);
        assert_eq!(ctl.position(), 0.0);
        assert!(!ctl.is_scrolling());
    }

    #[test]
    fn unavailable_recorder_does_not_disturb_scrolling() {
        let (mut ctl, clock) = controller();
        ctl.load_document("one two three four");
        ctl.set_viewport(40, 10);
        ctl.start_scrolling();
        assert_eq!(ctl.start_recording(), None);
        assert_matches!(ctl.recording_status(), RecordingStatus::Unavailable(_));
        assert!(!ctl.is_recording());

        clock.advance_ms(500);
        ctl.pump();
        assert!(ctl.is_scrolling());
        assert!(ctl.position() > 0.0);
        assert_eq!(ctl.stop_recording(), None);
    }
}
