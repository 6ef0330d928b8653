use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};
use crate::session::DockPosition;

/// Every tunable constant of the prompter, fixed at startup.
///
/// Components receive a reference at construction instead of reading
/// globals, so tests can shrink ranges or intervals freely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrompterConfig {
    pub min_speed: u32,
    pub max_speed: u32,
    pub default_speed: u32,
    /// Display units per tick at speed 1 are `1 / speed_calibration`
    pub speed_calibration: f64,
    pub scroll_tick_ms: u64,

    pub min_font_size: u16,
    pub max_font_size: u16,
    pub default_font_size: u16,
    pub font_size_step: u16,
    /// Line height as a multiple of the font size
    pub line_spacing: f64,

    pub stats_refresh_ms: u64,
    pub default_words_per_minute: f64,

    pub countdown_tick_ms: u64,
    pub default_countdown_minutes: u32,
    pub max_countdown_minutes: u32,

    /// Guide line distance from the top of the text area, as a fraction
    pub guide_position: f64,
    pub compact_lines: u16,
    pub default_dock: DockPosition,

    pub recordings_dir: PathBuf,
    pub recording_extension: String,
    pub audio_channels: u16,
    pub audio_sample_rate: u32,
}

impl Default for PrompterConfig {
    fn default() -> Self {
        Self {
            min_speed: 1,
            max_speed: 100,
            default_speed: 25,
            speed_calibration: 10.0,
            scroll_tick_ms: 50,
            min_font_size: 12,
            max_font_size: 72,
            default_font_size: 20,
            font_size_step: 2,
            line_spacing: 1.2,
            stats_refresh_ms: 1000,
            default_words_per_minute: 150.0,
            countdown_tick_ms: 1000,
            default_countdown_minutes: 5,
            max_countdown_minutes: 99,
            guide_position: 0.3,
            compact_lines: 3,
            default_dock: DockPosition::Bottom,
            recordings_dir: AppDirs::recordings_dir(),
            recording_extension: "wav".to_string(),
            audio_channels: 1,
            audio_sample_rate: 44_100,
        }
    }
}

impl PrompterConfig {
    pub fn scroll_tick(&self) -> Duration {
        Duration::from_millis(self.scroll_tick_ms)
    }

    pub fn stats_refresh(&self) -> Duration {
        Duration::from_millis(self.stats_refresh_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn clamp_speed(&self, speed: i64) -> u32 {
        speed.clamp(self.min_speed as i64, self.max_speed as i64) as u32
    }

    pub fn clamp_font_size(&self, size: i64) -> u16 {
        size.clamp(self.min_font_size as i64, self.max_font_size as i64) as u16
    }

    /// Height of one wrapped line in display units for a font size
    pub fn line_height(&self, font_size: u16) -> f64 {
        font_size as f64 * self.line_spacing
    }

    /// Rejects configurations the engine cannot run with
    pub fn validate(self) -> Result<Self> {
        if self.min_speed == 0 || self.min_speed > self.max_speed {
            return Err(Error::InvalidConfig(format!(
                "speed range {}..={} is empty or starts at zero",
                self.min_speed, self.max_speed
            )));
        }
        if self.min_font_size == 0 || self.min_font_size > self.max_font_size {
            return Err(Error::InvalidConfig(format!(
                "font size range {}..={} is empty or starts at zero",
                self.min_font_size, self.max_font_size
            )));
        }
        if self.scroll_tick_ms == 0 || self.stats_refresh_ms == 0 || self.countdown_tick_ms == 0 {
            return Err(Error::InvalidConfig(
                "timer intervals must be at least 1 ms".to_string(),
            ));
        }
        if !(self.speed_calibration > 0.0) || !(self.line_spacing > 0.0) {
            return Err(Error::InvalidConfig(
                "speed calibration and line spacing must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.guide_position) {
            return Err(Error::InvalidConfig(format!(
                "guide position {} is outside 0..=1",
                self.guide_position
            )));
        }
        Ok(self)
    }
}

/// Read-only JSON config source. Nothing is ever written back.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file yields the defaults; a malformed one is an error
    pub fn load(&self) -> Result<PrompterConfig> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice::<PrompterConfig>(&bytes)?.validate(),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PrompterConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
