//! Session configuration

use std::time::Duration;

use pbtscan_core::constants::{DEFAULT_RESET_SETTLE_MS, MAX_PAYLOAD_SIZE, MAX_RETRIES};

/// Scanner session settings
///
/// The read timeout belongs to the transport, see
/// [`SerialConfig`](pbtscan_transport::SerialConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Timed-out reads tolerated while the metadata header is outstanding
    pub metadata_retries: usize,

    /// Pause between writing Reset and draining the device's trailing output
    pub reset_settle: Duration,

    /// Close and reopen the port on every reset
    pub reopen_on_reset: bool,

    /// Largest payload length accepted from a header
    pub max_payload_len: usize,
}

impl ScannerConfig {
    /// Set metadata retry budget
    pub fn with_metadata_retries(mut self, retries: usize) -> Self {
        self.metadata_retries = retries;
        self
    }

    /// Set the pause after a reset
    pub fn with_reset_settle(mut self, settle: Duration) -> Self {
        self.reset_settle = settle;
        self
    }

    /// Reopen the port on each reset
    pub fn with_reopen_on_reset(mut self, reopen: bool) -> Self {
        self.reopen_on_reset = reopen;
        self
    }

    /// Set the payload length bound
    pub fn with_max_payload_len(mut self, max: usize) -> Self {
        self.max_payload_len = max;
        self
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            metadata_retries: MAX_RETRIES,
            reset_settle: Duration::from_millis(DEFAULT_RESET_SETTLE_MS),
            reopen_on_reset: false,
            max_payload_len: MAX_PAYLOAD_SIZE,
        }
    }
}
