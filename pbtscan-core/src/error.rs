//! Error types for pbtscan-core

/// Result type alias for pbtscan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame ended before the required number of bytes arrived
    #[error("Short frame: expected {expected} bytes, got {actual} bytes")]
    ShortFrame {
        expected: usize,
        actual: usize,
    },

    /// Nothing arrived within the retry budget
    #[error("Timeout waiting for response after {attempts} attempts")]
    Timeout {
        attempts: usize,
    },

    /// Length field of the metadata header is not 8 hex digits
    #[error("Malformed metadata header: {0}")]
    MalformedHeader(String),

    /// Declared payload exceeds the configured bound
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Bytes that are not a known command frame
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),
}

impl Error {
    /// Check if error is recoverable (a fresh cycle after reset might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::ShortFrame { .. }
                | Self::MalformedHeader(_)
                | Self::PayloadTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_errors_are_recoverable() {
        assert!(Error::ShortFrame { expected: 16, actual: 3 }.is_recoverable());
        assert!(Error::MalformedHeader("zz".into()).is_recoverable());
        assert!(Error::Timeout { attempts: 3 }.is_recoverable());
        assert!(!Error::InvalidSessionState("Disconnected".into()).is_recoverable());
    }

    #[test]
    fn test_short_frame_message() {
        let err = Error::ShortFrame { expected: 16, actual: 8 };
        assert_eq!(err.to_string(), "Short frame: expected 16 bytes, got 8 bytes");
    }
}
