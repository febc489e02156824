//! Cooperative cancellation shared between the caller and running shards

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::scanner::{ScanError, ScanResult};

/// Cloneable flag checked before every commit
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(ScanError::Cancelled)` once cancellation was requested
    pub fn check(&self) -> ScanResult<()> {
        if self.is_cancelled() {
            Err(ScanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(flag.check().is_ok());

        clone.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check(), Err(ScanError::Cancelled)));
    }

    #[test]
    fn test_cancel_across_threads() {
        let flag = CancellationFlag::new();
        let worker = flag.clone();
        std::thread::spawn(move || worker.cancel()).join().unwrap();
        assert!(flag.is_cancelled());
    }
}
