//! Barcode text read from the device

use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};

/// Barcode token as sent by the device, without its CR terminator
///
/// An empty token is valid: the device was polled but nothing was scanned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Barcode {
    raw: Bytes,
}

impl Barcode {
    /// Wrap raw token bytes
    ///
    /// Fails if the bytes contain a carriage return, since that byte
    /// terminates a token on the wire.
    pub fn new(raw: impl Into<Bytes>) -> Result<Self> {
        let raw = raw.into();
        if let Some(pos) = raw.iter().position(|&b| b == b'\r') {
            return Err(Error::Validation(format!(
                "barcode contains terminator at offset {pos}"
            )));
        }
        Ok(Self { raw })
    }

    /// Raw token bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Check if nothing was scanned
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Decoded text, used to label the captured image
    ///
    /// Non-ASCII bytes are replaced rather than rejected.
    pub fn label(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_barcode_label() {
        let barcode = Barcode::new(&b"ABC123"[..]).unwrap();
        assert_eq!(barcode.label(), "ABC123");
        assert!(!barcode.is_empty());
    }

    #[test]
    fn test_empty_barcode() {
        assert!(Barcode::default().is_empty());
        assert_eq!(Barcode::new(Bytes::new()).unwrap().label(), "");
    }

    #[test]
    fn test_barcode_rejects_terminator() {
        assert!(Barcode::new(&b"AB\rC"[..]).is_err());
    }
}
