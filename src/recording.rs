use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::PrompterConfig;
use crate::error::{Error, Result};

/// `recording_<YYYYMMDD_HHMMSS>.<ext>`; existing recordings directories
/// depend on this exact shape.
pub fn recording_file_name(at: DateTime<Local>, extension: &str) -> String {
    format!("recording_{}.{}", at.format("%Y%m%d_%H%M%S"), extension)
}

/// Start/stop contract of an audio recorder.
///
/// The session only sequences these calls; it never sees audio frames.
pub trait Recorder {
    /// Starts recording into `path`, or a timestamped file of the
    /// recorder's choosing. Calling it while recording changes nothing and
    /// returns the current file.
    fn start(&mut self, path: Option<PathBuf>) -> Result<PathBuf>;

    /// Flushes the recording to storage. `None` when nothing was recording.
    fn stop(&mut self) -> Result<Option<PathBuf>>;

    fn is_recording(&self) -> bool;
}

impl<R: Recorder + ?Sized> Recorder for Box<R> {
    fn start(&mut self, path: Option<PathBuf>) -> Result<PathBuf> {
        (**self).start(path)
    }

    fn stop(&mut self) -> Result<Option<PathBuf>> {
        (**self).stop()
    }

    fn is_recording(&self) -> bool {
        (**self).is_recording()
    }
}

#[derive(Debug, Default)]
struct SinkBuffer {
    accepting: bool,
    samples: Vec<i16>,
}

/// Thread-safe handle an audio producer appends PCM chunks to.
///
/// Chunks pushed while no recording is active are dropped.
#[derive(Debug, Clone, Default)]
pub struct AudioSink(Arc<Mutex<SinkBuffer>>);

impl AudioSink {
    fn lock(&self) -> MutexGuard<'_, SinkBuffer> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, chunk: &[i16]) {
        let mut buf = self.lock();
        if buf.accepting {
            buf.samples.extend_from_slice(chunk);
        }
    }

    fn open(&self) {
        let mut buf = self.lock();
        buf.samples.clear();
        buf.accepting = true;
    }

    fn close(&self) -> Vec<i16> {
        let mut buf = self.lock();
        buf.accepting = false;
        std::mem::take(&mut buf.samples)
    }
}

/// Buffers 16-bit PCM in memory and writes a WAV file on stop.
///
/// An existing file is never overwritten; starting into one fails.
#[derive(Debug)]
pub struct WavRecorder {
    dir: PathBuf,
    extension: String,
    spec: hound::WavSpec,
    sink: AudioSink,
    current: Option<PathBuf>,
}

impl WavRecorder {
    pub fn new(config: &PrompterConfig) -> Self {
        Self {
            dir: config.recordings_dir.clone(),
            extension: config.recording_extension.clone(),
            spec: hound::WavSpec {
                channels: config.audio_channels,
                sample_rate: config.audio_sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
            sink: AudioSink::default(),
            current: None,
        }
    }

    pub fn sink(&self) -> AudioSink {
        self.sink.clone()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_wav(&self, path: &Path, samples: &[i16]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let mut writer = hound::WavWriter::new(BufWriter::new(file), self.spec)?;
        for &s in samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

impl Recorder for WavRecorder {
    fn start(&mut self, path: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(current) = &self.current {
            return Ok(current.clone());
        }
        let path = path
            .unwrap_or_else(|| self.dir.join(recording_file_name(Local::now(), &self.extension)));
        if path.exists() {
            return Err(Error::RecordingUnavailable(format!(
                "{} already exists",
                path.display()
            )));
        }
        self.sink.open();
        self.current = Some(path.clone());
        Ok(path)
    }

    fn stop(&mut self) -> Result<Option<PathBuf>> {
        let Some(path) = self.current.take() else {
            return Ok(None);
        };
        let samples = self.sink.close();
        self.write_wav(&path, &samples)?;
        tracing::info!(path = %path.display(), samples = samples.len(), "recording_written");
        Ok(Some(path))
    }

    fn is_recording(&self) -> bool {
        self.current.is_some()
    }
}

/// Stand-in when no input device exists; every start fails
#[derive(Debug, Clone)]
pub struct UnavailableRecorder {
    reason: String,
}

impl UnavailableRecorder {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Recorder for UnavailableRecorder {
    fn start(&mut self, _path: Option<PathBuf>) -> Result<PathBuf> {
        Err(Error::RecordingUnavailable(self.reason.clone()))
    }

    fn stop(&mut self) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    fn is_recording(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn recorder_in(dir: &Path) -> WavRecorder {
        let config = PrompterConfig {
            recordings_dir: dir.join("recordings"),
            ..PrompterConfig::default()
        };
        WavRecorder::new(&config)
    }

    #[test]
    fn file_name_is_timestamped() {
        let at = Local.with_ymd_and_hms(2023, 11, 2, 7, 8, 9).unwrap();
        assert_eq!(recording_file_name(at, "wav"), "recording_20231102_070809.wav");
    }

    #[test]
    fn stop_writes_buffered_samples() {
        let dir = tempdir().unwrap();
        let mut rec = recorder_in(dir.path());
        let path = rec.start(None).unwrap();
        assert!(path.starts_with(dir.path().join("recordings")));

        let sink = rec.sink();
        let producer = std::thread::spawn(move || sink.push(&[1, -1, 300, -300]));
        producer.join().unwrap();

        assert_eq!(rec.stop().unwrap(), Some(path.clone()));
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 44_100);
        assert_eq!(reader.len(), 4);
    }

    #[test]
    fn second_stop_returns_none() {
        let dir = tempdir().unwrap();
        let mut rec = recorder_in(dir.path());
        assert_eq!(rec.stop().unwrap(), None);
        rec.start(Some(dir.path().join("take.wav"))).unwrap();
        assert!(rec.stop().unwrap().is_some());
        assert_eq!(rec.stop().unwrap(), None);
    }

    #[test]
    fn restart_while_recording_keeps_file() {
        let dir = tempdir().unwrap();
        let mut rec = recorder_in(dir.path());
        let first = rec.start(Some(dir.path().join("a.wav"))).unwrap();
        rec.sink().push(&[5, 6]);
        let again = rec.start(Some(dir.path().join("b.wav"))).unwrap();
        assert_eq!(first, again);

        rec.stop().unwrap();
        assert_eq!(hound::WavReader::open(&first).unwrap().len(), 2);
        assert!(!dir.path().join("b.wav").exists());
    }

    #[test]
    fn chunks_outside_a_recording_are_dropped() {
        let dir = tempdir().unwrap();
        let mut rec = recorder_in(dir.path());
        rec.sink().push(&[1, 2, 3]);
        let path = rec.start(Some(dir.path().join("late.wav"))).unwrap();
        rec.stop().unwrap();
        rec.sink().push(&[4, 5]);
        assert_eq!(hound::WavReader::open(&path).unwrap().len(), 0);
    }

    #[test]
    fn existing_file_is_never_overwritten() {
        let dir = tempdir().unwrap();
        let taken = dir.path().join("take.wav");
        fs::write(&taken, b"keep me").unwrap();

        let mut rec = recorder_in(dir.path());
        assert_matches!(
            rec.start(Some(taken.clone())),
            Err(Error::RecordingUnavailable(msg)) if msg.ends_with("already exists")
        );
        assert!(!rec.is_recording());
        assert_eq!(fs::read(&taken).unwrap(), b"keep me");
    }

    #[test]
    fn unavailable_recorder_fails_to_start() {
        let mut rec = UnavailableRecorder::new("no input device");
        assert_matches!(rec.start(None), Err(Error::RecordingUnavailable(msg)) if msg == "no input device");
        assert_eq!(rec.stop().unwrap(), None);
    }
}
