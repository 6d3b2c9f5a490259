//! PBT9500 command definitions and frame encoding

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    constants::{opcodes, COMMAND_TERMINATOR},
    error::{Error, Result},
};

/// Commands the session sends to the device
///
/// The protocol also reserves [`opcodes::CAPTURE_WITH_TRIGGER`], which is
/// not exposed here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Abort any capture and return to idle
    Reset,

    /// Capture an image after the last barcode read
    CaptureImage,
}

impl Command {
    /// ASCII opcode without terminator
    pub fn opcode(self) -> &'static str {
        match self {
            Self::Reset => opcodes::RESET,
            Self::CaptureImage => opcodes::CAPTURE_IMAGE,
        }
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::Reset => "RESET",
            Self::CaptureImage => "CAPTURE_IMAGE",
        }
    }

    /// Build the wire frame for this command
    ///
    /// # Examples
    ///
    /// ```
    /// use pbtscan_core::Command;
    ///
    /// let frame = Command::Reset.encode();
    /// assert_eq!(frame.as_bytes(), b"x040000000000\r\n");
    /// ```
    pub fn encode(self) -> CommandFrame {
        let opcode = self.opcode().as_bytes();
        let mut buf = BytesMut::with_capacity(opcode.len() + COMMAND_TERMINATOR.len());
        buf.put_slice(opcode);
        buf.put_slice(COMMAND_TERMINATOR);
        CommandFrame(buf.freeze())
    }
}

impl TryFrom<&[u8]> for Command {
    type Error = Error;

    /// Parse an opcode, with or without its CR LF terminator
    fn try_from(value: &[u8]) -> Result<Self> {
        let opcode = value.strip_suffix(COMMAND_TERMINATOR).unwrap_or(value);
        match opcode {
            b"x040000000000" => Ok(Self::Reset),
            b"x008000000000" => Ok(Self::CaptureImage),
            _ => Err(Error::UnknownCommand(
                String::from_utf8_lossy(value).escape_debug().to_string(),
            )),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.opcode())
    }
}

/// Encoded command: ASCII opcode followed by CR LF
///
/// Immutable once built; cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame(Bytes);

impl CommandFrame {
    /// Raw bytes to put on the wire
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode the frame back into its command
    pub fn command(&self) -> Result<Command> {
        Command::try_from(self.as_bytes())
    }

    /// Frame length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for frames produced by [`Command::encode`]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<Command> for CommandFrame {
    fn from(cmd: Command) -> Self {
        cmd.encode()
    }
}
