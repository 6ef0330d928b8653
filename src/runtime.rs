use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::clock::Clock;
use crate::recording::Recorder;
use crate::session::SessionController;

/// What the main loop reacts to. `Tick` is also what drives the session
/// timers, so it arrives at least once per ticker interval.
#[derive(Clone, Debug)]
pub enum PrompterEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
}

/// Source of terminal input
pub trait PrompterEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<PrompterEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<PrompterEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(PrompterEvent::Key(key))
                }
                Ok(CtEvent::Resize(w, h)) => tx.send(PrompterEvent::Resize(w, h)),
                Ok(_) => Ok(()),
                Err(e) => {
                    tracing::error!(error = %e, "terminal_input_failed");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PrompterEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PrompterEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// How long the runner waits for input before yielding a tick
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<PrompterEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<PrompterEvent>) -> Self {
        Self { rx }
    }
}

impl PrompterEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PrompterEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: PrompterEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: PrompterEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> PrompterEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                PrompterEvent::Tick
            }
        }
    }
}

/// User intents behind the key bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleScrolling,
    AdjustSpeed(i64),
    IncreaseFont,
    DecreaseFont,
    ToggleRecording,
    ArmCountdown,
    CancelCountdown,
    ToggleCompact,
    ToggleDock,
    TogglePresentation,
    /// Leaves presentation mode, or quits outside of it
    Back,
    Quit,
}

impl Command {
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Command::Quit),
                _ => None,
            };
        }
        let command = match key.code {
            KeyCode::Char(' ') => Command::ToggleScrolling,
            KeyCode::Up => Command::AdjustSpeed(1),
            KeyCode::Down => Command::AdjustSpeed(-1),
            KeyCode::PageUp => Command::AdjustSpeed(10),
            KeyCode::PageDown => Command::AdjustSpeed(-10),
            KeyCode::Char('+') | KeyCode::Char('=') => Command::IncreaseFont,
            KeyCode::Char('-') => Command::DecreaseFont,
            KeyCode::Char('r') => Command::ToggleRecording,
            KeyCode::Char('t') => Command::ArmCountdown,
            KeyCode::Char('c') => Command::CancelCountdown,
            KeyCode::Char('m') => Command::ToggleCompact,
            KeyCode::Char('d') => Command::ToggleDock,
            KeyCode::Char('f') | KeyCode::F(11) => Command::TogglePresentation,
            KeyCode::Esc => Command::Back,
            KeyCode::Char('q') => Command::Quit,
            _ => return None,
        };
        Some(command)
    }
}

/// Applies a command to the session. Returns false once the user asked to
/// quit; the caller still owns the mandatory `shutdown`.
pub fn dispatch<C: Clock, R: Recorder>(
    controller: &mut SessionController<C, R>,
    command: Command,
    countdown_minutes: u32,
) -> bool {
    tracing::debug!(?command, "dispatch");
    match command {
        Command::ToggleScrolling => {
            controller.toggle_scrolling();
        }
        Command::AdjustSpeed(delta) => {
            controller.adjust_speed(delta);
        }
        Command::IncreaseFont => {
            controller.increase_font();
        }
        Command::DecreaseFont => {
            controller.decrease_font();
        }
        Command::ToggleRecording => {
            controller.toggle_recording();
        }
        Command::ArmCountdown => {
            controller.arm_countdown(countdown_minutes);
        }
        Command::CancelCountdown => {
            controller.cancel_countdown();
        }
        Command::ToggleCompact => controller.toggle_compact(),
        Command::ToggleDock => controller.toggle_dock(),
        Command::TogglePresentation => controller.toggle_presentation(),
        Command::Back if controller.layout().presentation => controller.set_presentation(false),
        Command::Back | Command::Quit => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::PrompterConfig;
    use crate::recording::UnavailableRecorder;
    use std::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            PrompterEvent::Tick => {}
            other => panic!("expected Tick on timeout, got {other:?}"),
        }
    }

    #[test]
    fn step_passes_through_resize() {
        let (tx, rx) = mpsc::channel();
        tx.send(PrompterEvent::Resize(120, 40)).unwrap();
        let es = TestEventSource::new(rx);
        let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(10)));

        match runner.step() {
            PrompterEvent::Resize(120, 40) => {}
            other => panic!("expected Resize event, got {other:?}"),
        }
    }

    #[test]
    fn key_bindings() {
        assert_eq!(
            Command::from_key(key(KeyCode::Char(' '))),
            Some(Command::ToggleScrolling)
        );
        assert_eq!(
            Command::from_key(key(KeyCode::PageDown)),
            Some(Command::AdjustSpeed(-10))
        );
        assert_eq!(
            Command::from_key(key(KeyCode::F(11))),
            Some(Command::TogglePresentation)
        );
        assert_eq!(
            Command::from_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
        assert_eq!(
            Command::from_key(key(KeyCode::Char('c'))),
            Some(Command::CancelCountdown)
        );
        assert_eq!(Command::from_key(key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn escape_leaves_presentation_before_quitting() {
        let mut ctl = SessionController::new(
            PrompterConfig::default(),
            ManualClock::new(),
            UnavailableRecorder::new("none"),
        );
        assert!(dispatch(&mut ctl, Command::TogglePresentation, 5));
        assert!(ctl.layout().presentation);
        assert!(dispatch(&mut ctl, Command::Back, 5));
        assert!(!ctl.layout().presentation);
        assert!(!dispatch(&mut ctl, Command::Back, 5));
    }

    #[test]
    fn speed_keys_clamp_at_range_ends() {
        let mut ctl = SessionController::new(
            PrompterConfig::default(),
            ManualClock::new(),
            UnavailableRecorder::new("none"),
        );
        for _ in 0..20 {
            dispatch(&mut ctl, Command::AdjustSpeed(10), 5);
        }
        assert_eq!(ctl.speed().get(), 100);
        for _ in 0..20 {
            dispatch(&mut ctl, Command::AdjustSpeed(-10), 5);
        }
        assert_eq!(ctl.speed().get(), 1);
    }
}
