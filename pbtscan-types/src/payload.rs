//! Image payload read after a capture

use std::fmt;

use bytes::Bytes;

/// Image bytes exactly as streamed by the device
///
/// `data` holds at most `declared` bytes. When the stream stopped early,
/// `data` is shorter and [`ImagePayload::is_truncated`] is true; the buffer
/// is never padded.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    data: Bytes,
    declared: usize,
}

impl ImagePayload {
    /// Create a payload from the bytes received and the length the header declared
    pub fn new(data: impl Into<Bytes>, declared: usize) -> Self {
        Self {
            data: data.into(),
            declared,
        }
    }

    /// Received bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume into the received bytes
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Length announced in the metadata header
    pub fn declared_len(&self) -> usize {
        self.declared
    }

    /// Number of bytes actually received
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no bytes were received
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if fewer bytes arrived than declared
    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.declared
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("received", &self.data.len())
            .field("declared", &self.declared)
            .field("truncated", &self.is_truncated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_payload() {
        let payload = ImagePayload::new(vec![0xFF, 0xD8, 0xFF], 3);
        assert_eq!(payload.len(), 3);
        assert!(!payload.is_truncated());
    }

    #[test]
    fn test_truncated_payload() {
        let payload = ImagePayload::new(vec![0xFF], 16);
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.declared_len(), 16);
        assert!(payload.is_truncated());
    }

    #[test]
    fn test_debug_omits_bytes() {
        let payload = ImagePayload::new(vec![1, 2, 3], 5);
        assert_eq!(
            format!("{payload:?}"),
            "ImagePayload { received: 3, declared: 5, truncated: true }"
        );
    }
}
