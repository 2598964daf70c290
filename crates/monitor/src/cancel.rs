//! Cooperative cancellation shared between the signal handler and the run loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A one-way "please stop" flag.
///
/// Clones share the same underlying flag. Setting it is a single atomic store,
/// so it is safe to call from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run loop to stop at its next check point.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_requested());

        handle.request();
        assert!(flag.is_requested());
    }

    #[test]
    fn test_request_visible_across_threads() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        std::thread::spawn(move || handle.request()).join().unwrap();
        assert!(flag.is_requested());
    }
}
