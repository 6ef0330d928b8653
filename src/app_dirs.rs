use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "prompter")
    }

    pub fn recordings_dir() -> PathBuf {
        Self::project()
            .map(|pd| pd.data_dir().join("recordings"))
            .unwrap_or_else(|| PathBuf::from("recordings"))
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("prompter_config.json"))
    }

    /// Log file under $HOME/.local/state/prompter, falling back to the
    /// platform's local data dir
    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("prompter")
                .join("prompter.log")
        } else {
            Self::project()
                .map(|pd| pd.data_local_dir().join("prompter.log"))
                .unwrap_or_else(|| PathBuf::from("prompter.log"))
        }
    }
}
