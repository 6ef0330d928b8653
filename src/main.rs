pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing_subscriber::prelude::*;

use prompter::{
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{FileConfigStore, PrompterConfig},
    recording::{Recorder, UnavailableRecorder},
    runtime::{dispatch, Command, CrosstermEventSource, FixedTicker, PrompterEvent, Runner},
    session::{DockPosition, SessionController, SessionEvent},
    time_series::SessionSummary,
};

use crate::ui::layout::{text_area, wrap_lines, wrap_width};

/// terminal teleprompter with auto-scroll, reading stats, countdown and recording
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Scrolls a script past a reading guide at an adjustable pace, tracks words per minute and time left, and runs a rehearsal countdown. Recording reports itself unavailable: this build has no audio capture."
)]
pub struct Cli {
    /// text file to read from
    file: PathBuf,

    /// initial scroll speed (clamped to the configured range)
    #[clap(short = 's', long)]
    speed: Option<i64>,

    /// initial font size in points; larger sizes wrap the text narrower
    #[clap(short = 'f', long)]
    font_size: Option<i64>,

    /// edge the compact window docks to
    #[clap(short = 'd', long, value_enum)]
    dock: Option<DockPosition>,

    /// start in the compact docked layout
    #[clap(long)]
    compact: bool,

    /// start in full-screen presentation mode
    #[clap(long)]
    presentation: bool,

    /// minutes the countdown arms with when pressing `t`
    #[clap(short = 'c', long)]
    countdown: Option<u32>,

    /// where session recordings are written
    #[clap(long)]
    recordings_dir: Option<PathBuf>,

    /// JSON config file (defaults to the platform config directory)
    #[clap(long)]
    config: Option<PathBuf>,

    /// print the session summary as JSON on exit
    #[clap(long)]
    summary_json: bool,
}

impl Cli {
    /// Config file values, with command-line overrides on top
    fn load_config(&self) -> prompter::Result<PrompterConfig> {
        let store = match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let mut config = store.load()?;
        if let Some(dir) = &self.recordings_dir {
            config.recordings_dir = dir.clone();
        }
        if let Some(dock) = self.dock {
            config.default_dock = dock;
        }
        config.validate()
    }

    fn countdown_minutes(&self, config: &PrompterConfig) -> u32 {
        self.countdown
            .unwrap_or(config.default_countdown_minutes)
            .min(config.max_countdown_minutes)
    }
}

pub type Controller = SessionController<SystemClock, Box<dyn Recorder>>;

pub struct App {
    pub controller: Controller,
    pub title: String,
    pub countdown_minutes: u32,
    /// Last thing worth telling the user; replaces the legend until the next key
    pub notice: Option<String>,
    lines: Vec<String>,
    wrapped_at: Option<usize>,
}

impl App {
    pub fn new(controller: Controller, title: impl Into<String>, countdown_minutes: u32) -> Self {
        Self {
            controller,
            title: title.into(),
            countdown_minutes,
            notice: None,
            lines: Vec::new(),
            wrapped_at: None,
        }
    }

    pub fn load(&mut self, text: impl Into<String>) {
        self.controller.load_document(text);
        self.wrapped_at = None;
        self.absorb_events();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn wrap_width(&self) -> usize {
        self.wrapped_at.unwrap_or(1)
    }

    /// Re-wraps for the current terminal size and font, then tells the
    /// session how many lines are off screen.
    pub fn sync_viewport(&mut self, area: Rect) {
        let config = self.controller.config();
        let text = text_area(area, self.controller.layout(), config.compact_lines);
        let width = wrap_width(text.width, self.controller.font_size(), config.default_font_size);

        if self.wrapped_at != Some(width) {
            self.lines = wrap_lines(self.controller.document().text(), width);
            self.wrapped_at = Some(width);
        }
        self.controller
            .set_viewport(self.lines.len(), text.height as usize);
    }

    /// Returns false once the user asked to quit
    pub fn handle(&mut self, event: PrompterEvent) -> bool {
        let keep_running = match event {
            PrompterEvent::Key(key) => {
                self.notice = None;
                match Command::from_key(key) {
                    Some(command) => dispatch(&mut self.controller, command, self.countdown_minutes),
                    None => true,
                }
            }
            PrompterEvent::Resize(..) | PrompterEvent::Tick => true,
        };
        self.controller.pump();
        self.absorb_events();
        keep_running
    }

    fn absorb_events(&mut self) {
        for event in self.controller.drain_events() {
            let notice = match event {
                SessionEvent::EndOfDocument => "end of script".to_string(),
                SessionEvent::CountdownExpired => "time is up".to_string(),
                SessionEvent::RecordingSaved(path) => format!("recording saved to {}", path.display()),
                SessionEvent::RecordingUnavailable(reason) => reason,
                _ => continue,
            };
            self.notice = Some(notice);
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Must run before raw mode: a failure is reported on stderr
fn init_logging() {
    let path = AppDirs::log_path();
    // the TUI owns the terminal, so without a log file there is no logging
    let file = match open_log_file(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("prompter: logging disabled, cannot open {}: {e}", path.display());
            return;
        }
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
}

/// No capture backend is compiled in, so `r` reports the device as missing
fn build_recorder() -> Box<dyn Recorder> {
    Box::new(UnavailableRecorder::new("no audio capture in this build"))
}

fn build_app(cli: &Cli, config: PrompterConfig, text: String) -> App {
    let countdown_minutes = cli.countdown_minutes(&config);
    let recorder = build_recorder();
    let mut controller = SessionController::new(config, SystemClock::new(), recorder);

    if let Some(speed) = cli.speed {
        controller.set_speed(speed);
    }
    if let Some(size) = cli.font_size {
        controller.set_font_size(size);
    }
    if cli.compact {
        controller.toggle_compact();
    }
    controller.set_presentation(cli.presentation);

    let title = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.file.display().to_string());
    let mut app = App::new(controller, title, countdown_minutes);
    app.load(text);
    app
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config = cli.load_config()?;
    let text = fs::read_to_string(&cli.file)?;
    init_logging();
    tracing::info!(file = %cli.file.display(), "prompter_started");

    let mut app = build_app(&cli, config, text);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    app.controller.shutdown();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result?;

    print_summary(&app.controller.summary(), cli.summary_json)?;
    Ok(())
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let tick = app.controller.config().scroll_tick();
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::new(tick));

    loop {
        let size = terminal.size()?;
        app.sync_viewport(Rect::new(0, 0, size.width, size.height));
        terminal.draw(|f| ui::draw(app, f))?;

        if !app.handle(runner.step()) {
            break;
        }
    }
    Ok(())
}

fn print_summary(summary: &SessionSummary, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    println!(
        "{}/{} words ({:.0}%) in {:.0}s",
        summary.words_read, summary.total_words, summary.progress_percent, summary.elapsed_seconds
    );
    println!(
        "{:.0} wpm final   {:.0} mean   {:.0} peak   {:.2} sd",
        summary.final_wpm, summary.mean_wpm, summary.peak_wpm, summary.wpm_std_dev
    );
    if let Some(path) = &summary.recording {
        println!("recording: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use prompter::session::RecordingStatus;

    pub(crate) fn test_app(text: &str) -> App {
        let recorder: Box<dyn Recorder> = Box::new(UnavailableRecorder::new("no input device"));
        let controller =
            SessionController::new(PrompterConfig::default(), SystemClock::new(), recorder);
        let mut app = App::new(controller, "script.txt", 5);
        app.load(text.to_string());
        app
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("prompter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_defaults() {
        let cli = cli(&["talk.txt"]);
        assert_eq!(cli.file, PathBuf::from("talk.txt"));
        assert_eq!(cli.speed, None);
        assert!(!cli.compact);
        assert!(!cli.summary_json);
        assert_eq!(cli.countdown_minutes(&PrompterConfig::default()), 5);
    }

    #[test]
    fn cli_requires_a_file() {
        assert!(Cli::try_parse_from(["prompter"]).is_err());
    }

    #[test]
    fn cli_overrides() {
        let cli = cli(&[
            "talk.txt",
            "--speed",
            "40",
            "--dock",
            "top",
            "--countdown",
            "500",
            "--compact",
            "--presentation",
        ]);
        assert_eq!(cli.speed, Some(40));
        assert_eq!(cli.dock, Some(DockPosition::Top));
        assert_eq!(cli.countdown_minutes(&PrompterConfig::default()), 99);
    }

    #[test]
    fn cli_config_overrides_apply_on_top_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, r#"{ "default_speed": 30 }"#).unwrap();
        let recordings = dir.path().join("takes");

        let cli = cli(&[
            "talk.txt",
            "--config",
            config_path.to_str().unwrap(),
            "--recordings-dir",
            recordings.to_str().unwrap(),
            "--dock",
            "top",
        ]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.default_speed, 30);
        assert_eq!(config.recordings_dir, recordings);
        assert_eq!(config.default_dock, DockPosition::Top);
    }

    #[test]
    fn build_app_applies_flags() {
        let dir = tempfile::tempdir().unwrap();
        let cli = cli(&["notes/talk.txt", "--speed", "500", "--font-size", "40", "--compact"]);
        let config = PrompterConfig {
            recordings_dir: dir.path().to_path_buf(),
            ..PrompterConfig::default()
        };
        let app = build_app(&cli, config, "one two three".to_string());
        assert_eq!(app.title, "talk.txt");
        assert_eq!(app.controller.speed().get(), 100);
        assert_eq!(app.controller.font_size(), 40);
        assert!(app.controller.layout().compact);
        assert_eq!(app.controller.document().word_count(), 3);
    }

    #[test]
    fn record_key_reports_missing_capture() {
        let cli = cli(&["talk.txt"]);
        let mut app = build_app(&cli, PrompterConfig::default(), "one two".to_string());
        assert_eq!(app.controller.toggle_recording(), None);
        assert_eq!(
            app.controller.recording_status(),
            &RecordingStatus::Unavailable(
                "recording unavailable: no audio capture in this build".to_string()
            )
        );
        assert!(!app.controller.is_recording());
    }

    #[test]
    fn log_file_under_a_plain_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("state");
        fs::write(&blocker, b"").unwrap();
        assert!(open_log_file(&blocker.join("prompter.log")).is_err());

        let log = dir.path().join("logs").join("prompter.log");
        assert!(open_log_file(&log).is_ok());
        assert!(log.exists());
    }

    #[test]
    fn font_change_rewraps() {
        let mut app = test_app("aaaa bbbb cccc dddd eeee ffff");
        let area = Rect::new(0, 0, 40, 20);
        app.controller.set_presentation(true);
        app.sync_viewport(area);
        assert_eq!(app.lines().len(), 1);

        app.controller.set_font_size(72);
        app.sync_viewport(area);
        assert_eq!(app.wrap_width(), 11);
        assert_eq!(app.lines().len(), 3);
    }

    #[test]
    fn quit_key_stops_the_loop() {
        use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
        let mut app = test_app("hello");
        let space = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        assert!(app.handle(PrompterEvent::Key(space)));
        let q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(!app.handle(PrompterEvent::Key(q)));
    }

    #[test]
    fn unavailable_recording_becomes_a_notice() {
        use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
        let mut app = test_app("hello");
        let r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE);
        app.handle(PrompterEvent::Key(r));
        assert_eq!(
            app.notice.as_deref(),
            Some("recording unavailable: no input device")
        );
    }
}
