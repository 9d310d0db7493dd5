//! Cooperative cancellation for finalize runs.
//!
//! A finalize run checks the flag between segments and between samples.
//! Nothing is interrupted mid-sample: the current decoder/encoder pair is
//! dropped on the way out, which releases it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{CurvecutError, CurvecutResult};

/// Shared cancellation flag. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a new, un-raised flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Return `Cancelled` if the flag is raised.
    pub fn check(&self, stage: &str) -> CurvecutResult<()> {
        if self.is_cancelled() {
            return Err(CurvecutError::cancelled(stage));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(flag.check("curves").is_ok());

        other.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(
            flag.check("curves"),
            Err(CurvecutError::Cancelled { .. })
        ));
    }
}
