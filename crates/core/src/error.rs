use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the core. Transient "not visible this poll" outcomes
/// are never errors; they live in `MatchRecord::found`.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("process '{0}' is not running")]
    ProcessNotRunning(String),

    #[error("no window titled '{title}' (process '{process}' is running)")]
    WindowNotFound { process: String, title: String },

    #[error("no display contains the client window")]
    DisplayNotFound,

    #[error("client window is contained by {count} displays")]
    AmbiguousDisplay { count: usize },

    #[error("no sub-image named '{0}'")]
    SubImageNotFound(String),

    #[error("sub-image '{0}' is already registered")]
    DuplicateSubImage(String),

    #[error("no movement script named '{0}'")]
    ScriptNotFound(String),

    #[error("{inner} is not inside {outer}")]
    Geometry { outer: String, inner: String },

    #[error("invalid asset {}: {reason}", path.display())]
    AssetFormat { path: PathBuf, reason: String },

    #[error("capture failed: {0}")]
    Capture(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("condition watcher panicked")]
    WatcherPanicked,

    #[error("stopped by user")]
    Stopped,
}

impl BotError {
    pub fn asset(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BotError::AssetFormat { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
