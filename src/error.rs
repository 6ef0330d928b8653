use thiserror::Error;

use crate::scheduler::TimerHandle;

#[derive(Debug, Error)]
pub enum Error {
    /// The audio input could not be opened or is missing.
    #[error("recording unavailable: {0}")]
    RecordingUnavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wav encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("timer {0:?} is not owned by any component")]
    UnknownTimer(TimerHandle),
}

pub type Result<T> = std::result::Result<T, Error>;
