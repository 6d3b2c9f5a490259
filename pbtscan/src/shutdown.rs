//! Cooperative cancellation of an in-flight scan

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag that stops a blocked scan
///
/// Reads are bounded by the transport timeout, so a triggered signal is
/// observed within one timeout interval.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the scanner to stop
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
    }

    /// Check if a stop was requested
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }
}
