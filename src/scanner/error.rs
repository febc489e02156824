//! Errors raised while walking repository history

use thiserror::Error;

/// Errors that can occur while scanning history
#[derive(Debug, Error)]
pub enum ScanError {
    /// Opening the repository or reading an object failed
    #[error("Repository error: {0}")]
    Repository(String),

    /// Line diff computation error
    #[error("Diff error: {0}")]
    Diff(String),

    /// Worker pool setup or execution error
    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Analysis was cancelled")]
    Cancelled,
}

impl ScanError {
    /// Repository error, with a hint appended for the common causes
    pub fn repository(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let hint = if msg.contains("not a git repository") || msg.contains("could not find repository") {
            Some("Run from inside a git repository or pass --repo.")
        } else if msg.contains("Permission denied") {
            Some("Check read access to the repository directory.")
        } else {
            None
        };
        match hint {
            Some(hint) => Self::Repository(format!("{msg}\n\n{hint}")),
            None => Self::Repository(msg),
        }
    }

    pub fn repository_with_path(msg: impl Into<String>, path: impl AsRef<std::path::Path>) -> Self {
        Self::Repository(format!("{}\n\nRepository path: {}", msg.into(), path.as_ref().display()))
    }

    pub fn diff(msg: impl Into<String>) -> Self {
        Self::Diff(msg.into())
    }

    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

/// Result type for scanning operations
pub type ScanResult<T> = Result<T, ScanError>;
