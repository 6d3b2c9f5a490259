//! Metadata header sent by the device ahead of an image payload

use std::fmt;

use tracing::trace;

use crate::{
    constants::header::{LENGTH_END, LENGTH_START},
    error::{Error, Result},
    HEADER_SIZE,
};

/// Fixed 16-byte block that follows a capture command
///
/// # Header Structure
///
/// ```text
/// ┌─────────────┬──────────────────────────┬─────────────┐
/// │  (unused)   │      Payload length      │  (unused)   │
/// │   4 bytes   │  8 ASCII hex digits      │   4 bytes   │
/// └─────────────┴──────────────────────────┴─────────────┘
/// ```
///
/// Only meaningful right after a capture command; the session refuses to
/// read one in any other state.
///
/// # Examples
///
/// ```
/// use pbtscan_core::MetadataHeader;
///
/// let header = MetadataHeader::from_bytes(b"x00800000010\0\0\0\0").unwrap();
/// assert_eq!(header.payload_len().unwrap(), 0x10);
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MetadataHeader([u8; HEADER_SIZE]);

impl MetadataHeader {
    /// Header size in bytes
    pub const SIZE: usize = HEADER_SIZE;

    /// Wrap exactly [`Self::SIZE`] bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; HEADER_SIZE] = bytes.try_into().map_err(|_| Error::ShortFrame {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(raw))
    }

    /// Raw header bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The 8-byte length field
    pub fn length_field(&self) -> &[u8] {
        &self.0[LENGTH_START..LENGTH_END]
    }

    /// Decode the payload length declared by the device
    ///
    /// The field must be exactly eight ASCII hex digits; signs, spaces and
    /// any other byte are rejected.
    pub fn payload_len(&self) -> Result<usize> {
        let field = self.length_field();

        if !field.iter().all(u8::is_ascii_hexdigit) {
            return Err(Error::MalformedHeader(format!(
                "length field is not hexadecimal: {}",
                hex::encode(field)
            )));
        }

        // All bytes are ASCII hex digits, so this is valid UTF-8
        let digits = std::str::from_utf8(field)
            .map_err(|e| Error::MalformedHeader(e.to_string()))?;
        let len = u32::from_str_radix(digits, 16)
            .map_err(|e| Error::MalformedHeader(format!("{digits}: {e}")))?;

        trace!("Header length field {} = {} bytes", digits, len);

        Ok(len as usize)
    }
}

impl fmt::Debug for MetadataHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataHeader")
            .field("raw", &hex::encode(self.0))
            .field("length_field", &String::from_utf8_lossy(self.length_field()))
            .finish()
    }
}
