use serde::Serialize;
use std::path::PathBuf;

/// WPM observed at `t` seconds into the session
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WpmPoint {
    pub t: f64,
    pub wpm: f64,
}

impl WpmPoint {
    pub fn new(t: f64, wpm: f64) -> Self {
        Self { t, wpm }
    }
}

/// End-of-session report printed by the binary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_words: usize,
    pub words_read: usize,
    pub progress_percent: f64,
    pub elapsed_seconds: f64,
    pub final_wpm: f64,
    pub mean_wpm: f64,
    pub peak_wpm: f64,
    pub wpm_std_dev: f64,
    pub samples: usize,
    pub recording: Option<PathBuf>,
}

/// Mean and population standard deviation of the WPM history.
/// Samples taken before any words were read are ignored.
pub fn wpm_spread(points: &[WpmPoint]) -> (f64, f64) {
    let values: Vec<f64> = points.iter().map(|p| p.wpm).filter(|w| *w > 0.0).collect();
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub fn peak_wpm(points: &[WpmPoint]) -> f64 {
    points.iter().map(|p| p.wpm).fold(0.0, f64::max)
}
