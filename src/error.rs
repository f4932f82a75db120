//! Error types for shellterm

use std::io;
use thiserror::Error;

/// Main error type for shellterm
///
/// Every failure is scoped to a single session. Malformed escape sequences
/// are not represented here because the interpreter never fails on input.
#[derive(Error, Debug)]
pub enum ShelltermError {
    /// The child process or its pseudo-terminal could not be created
    #[error("Failed to spawn child process: {0}")]
    SpawnFailed(String),

    /// The channel was already closed
    #[error("Process channel is closed")]
    Closed,

    #[error("Read from PTY failed: {0}")]
    ReadFailed(String),

    #[error("Write to PTY failed: {0}")]
    WriteFailed(String),

    #[error("PTY resize failed: {0}")]
    ResizeFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("{0}")]
    Other(String),
}

impl ShelltermError {
    /// Whether this error ends the session it came from
    ///
    /// Write and resize failures leave the session open; the child may have
    /// simply exited or the failure may be transient.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShelltermError::SpawnFailed(_) | ShelltermError::Closed | ShelltermError::ReadFailed(_)
        )
    }
}

/// Result type alias for shellterm operations
pub type Result<T> = std::result::Result<T, ShelltermError>;

impl From<String> for ShelltermError {
    fn from(s: String) -> Self {
        ShelltermError::Other(s)
    }
}

impl From<&str> for ShelltermError {
    fn from(s: &str) -> Self {
        ShelltermError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for ShelltermError {
    fn from(e: serde_json::Error) -> Self {
        ShelltermError::Other(format!("JSON error: {}", e))
    }
}
