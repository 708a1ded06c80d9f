//! Single-fire completion signal shared by the capture and extraction loops

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Monotonic false → true flag; clones observe the same state
#[derive(Debug, Clone, Default)]
pub struct CompletionFlag {
    done: Arc<AtomicBool>,
}

impl CompletionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns `true` only for the call that performed the transition.
    pub fn set(&self) -> bool {
        self.done
            .compare_exchange(false, true, Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}
