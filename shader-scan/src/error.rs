use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while scanning shader directories
#[derive(Debug, Error)]
pub enum ScanError {
    /// I/O error when reading file metadata
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when listing the contents of a watched directory
    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The extractor program could not be started
    #[error("Failed to run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// The extractor exited unsuccessfully
    #[error("Extractor failed on {} with {status}", .path.display())]
    ExitStatus { path: PathBuf, status: ExitStatus },

    /// The extractor did not finish in time and was killed
    #[error("Extractor timed out after {timeout:?} on {}", .path.display())]
    Timeout { path: PathBuf, timeout: Duration },

    /// The extractor wrote something that is not UTF-8
    #[error("Extractor output for {} is not valid UTF-8", .path.display())]
    InvalidUtf8 { path: PathBuf },

    /// The extractor output is missing expected lines
    #[error("Malformed extractor output for {}: {reason}", .path.display())]
    MalformedOutput { path: PathBuf, reason: String },
}

/// A specialized Result type for shader scanning operations
pub type Result<T> = std::result::Result<T, ScanError>;
