//! Error types for the exclusion watcher.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the exclusion watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// Path exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Exclusion tool ran but reported failure.
    #[error("exclusion tool failed for {}: {status}", path.display())]
    ToolFailed {
        /// Directory that was being excluded.
        path: PathBuf,
        /// Exit status of the tool.
        status: ExitStatus,
    },

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
