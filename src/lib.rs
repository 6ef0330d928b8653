// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod document;
pub mod engine;
pub mod error;
pub mod recording;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod time_series;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{FileConfigStore, PrompterConfig};
pub use error::{Error, Result};
pub use session::{DockPosition, SessionController, SessionEvent};
