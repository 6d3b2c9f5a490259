//! Session state of a scanner connection

use std::fmt;

/// Session state
///
/// ```text
/// Disconnected ──open──▶ Idle ──barcode──▶ Capturing ──payload──▶ Saving
///      ▲                  ▲                    │                    │
///      └──────close───────┴───────reset────────┴────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Port not open
    #[default]
    Disconnected,

    /// Connected, device reset, waiting for a barcode
    Idle,

    /// Capture command sent, waiting for metadata and payload
    Capturing,

    /// Payload handed to persistence, reset pending
    Saving,
}

impl SessionState {
    /// Check if the port is open
    pub fn is_connected(self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// Check if a metadata header may be read in this state
    pub fn expects_header(self) -> bool {
        matches!(self, Self::Capturing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Saving => "saving",
        };
        f.write_str(name)
    }
}
