//! Pipeline Error Types

use thiserror::Error;

use crate::scanner::ScanError;
use crate::shotness::ShotnessError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// History could not be read, or the run was cancelled
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Checkpoint could not be written between chunks
    #[error(transparent)]
    Checkpoint(#[from] ShotnessError),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Scan(e) if e.is_cancelled())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
