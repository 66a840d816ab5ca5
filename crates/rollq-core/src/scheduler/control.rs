//! Cooperative stop token for a running scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag. Clone it into callbacks or other threads; the run loop
/// checks it between completions and before each poll. Transfers already
/// handed to the engine are never interrupted early.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the current run to stop at its next checkpoint.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn set(&self, stop: bool) {
        self.flag.store(stop, Ordering::Relaxed);
    }

    pub(crate) fn clear(&self) {
        self.set(false);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let a = StopHandle::new();
        let b = a.clone();
        assert!(!b.is_stop_requested());
        a.request_stop();
        assert!(b.is_stop_requested());
        b.clear();
        assert!(!a.is_stop_requested());
    }
}
