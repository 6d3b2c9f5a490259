//! Protocol constants

/// Carriage return, terminates barcode text
pub const CR: u8 = b'\r';

/// Line feed, precedes the image payload
pub const LF: u8 = b'\n';

/// Terminator appended to every outbound command
pub const COMMAND_TERMINATOR: &[u8] = b"\r\n";

/// Default read timeout (seconds)
pub const DEFAULT_READ_TIMEOUT: u64 = 3;

/// Pause after a reset before residual bytes are drained (milliseconds)
pub const DEFAULT_RESET_SETTLE_MS: u64 = 1000;

/// Timed-out reads tolerated while waiting for the metadata header
pub const MAX_RETRIES: usize = 3;

/// Fixed line settings of the virtual COM port
pub const BAUD_RATE: u32 = 9600;

/// Longest barcode token accepted before the bytes are treated as noise
pub const MAX_BARCODE_LEN: usize = 256;

/// Upper bound on a declared payload length (16 MiB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Command opcodes
pub mod opcodes {
    /// Full reset: aborts any capture and returns the device to idle
    pub const RESET: &str = "x040000000000";

    /// Automatic image capture after the last barcode read
    pub const CAPTURE_IMAGE: &str = "x008000000000";

    /// Image capture gated on the external trigger.
    ///
    /// Reserved by the protocol; the session never sends it.
    pub const CAPTURE_WITH_TRIGGER: &str = "x018300000000";
}

/// Layout of the 16-byte metadata header
pub mod header {
    /// Offset of the 8 hex digits holding the payload length
    pub const LENGTH_START: usize = 4;

    /// End (exclusive) of the payload length field
    pub const LENGTH_END: usize = 12;
}
