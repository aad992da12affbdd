use std::path::PathBuf;
use thiserror::Error;

/// Main error type for relaylog
#[derive(Debug, Error)]
pub enum LogError {
    // Configuration errors
    #[error("empty path")]
    EmptyPath,

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("config path is a directory: {}", .0.display())]
    IsDirectory(PathBuf),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported config format: {0}. Use .toml or .json")]
    UnsupportedFormat(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to create log root {}: {source}", path.display())]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Runtime errors
    #[error("reload callback panicked: {0}")]
    Callback(String),

    #[error("manager has been stopped")]
    Stopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for relaylog operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
