//! Frame extraction from the device byte stream
//!
//! The device sends no delimiters besides a CR after barcode text and a
//! declared length for the image, so each read here knows exactly what it
//! is waiting for.

use bytes::{Bytes, BytesMut};
use pbtscan_core::{
    constants::{CR, LF, MAX_BARCODE_LEN},
    MetadataHeader, HEADER_SIZE,
};
use pbtscan_transport::Transport;
use pbtscan_types::{Barcode, ImagePayload};
use tracing::{debug, trace, warn};

use crate::{
    error::{Error, Result},
    shutdown::ShutdownSignal,
};

/// Reads protocol frames from a borrowed transport
pub struct FrameReader<'a> {
    transport: &'a mut dyn Transport,
    shutdown: &'a ShutdownSignal,
}

impl<'a> FrameReader<'a> {
    pub fn new(transport: &'a mut dyn Transport, shutdown: &'a ShutdownSignal) -> Self {
        Self { transport, shutdown }
    }

    /// Wait for a CR-terminated barcode
    ///
    /// Timed-out reads mean the device is still idle; this only returns once
    /// a terminator arrives or the shutdown signal fires. Tokens longer than
    /// [`MAX_BARCODE_LEN`] are line noise and are dropped up to the next CR
    /// or timeout.
    pub async fn read_barcode(&mut self) -> Result<Barcode> {
        let mut token = BytesMut::new();
        let mut discarding = false;

        loop {
            if self.shutdown.is_triggered() {
                return Err(Error::Cancelled);
            }

            let limit = MAX_BARCODE_LEN + 1 - token.len();
            let until = self.transport.read_until(CR, limit).await?;

            // Noise runs until the next CR or quiet line
            if discarding {
                if until.terminated || until.data.len() < limit {
                    discarding = false;
                }
                continue;
            }

            token.extend_from_slice(&until.data);

            if token.len() > MAX_BARCODE_LEN {
                warn!("Discarding {} bytes without CR", token.len());
                token.clear();
                discarding = true;
                continue;
            }

            if until.terminated {
                let barcode = Barcode::new(token.freeze())?;
                debug!("Barcode token: {:?}", barcode.label());
                return Ok(barcode);
            }

            if !token.is_empty() {
                trace!("Partial barcode ({} bytes), waiting for CR", token.len());
            }
        }
    }

    /// Read the 16-byte header that follows a capture command
    ///
    /// Up to `retries` timed-out reads are tolerated while the device
    /// prepares the image.
    pub async fn read_metadata(&mut self, retries: usize) -> Result<MetadataHeader> {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        let attempts = retries + 1;

        for attempt in 1..=attempts {
            if self.shutdown.is_triggered() {
                return Err(Error::Cancelled);
            }

            let chunk = self.transport.read_exact(HEADER_SIZE - buf.len()).await?;
            buf.extend_from_slice(&chunk);

            if buf.len() == HEADER_SIZE {
                let header = MetadataHeader::from_bytes(&buf)?;
                debug!("Metadata header: {:?}", header);
                return Ok(header);
            }

            debug!(
                "Metadata read timed out with {}/{} bytes (attempt {}/{})",
                buf.len(),
                HEADER_SIZE,
                attempt,
                attempts
            );
        }

        let err = if buf.is_empty() {
            pbtscan_core::Error::Timeout { attempts }
        } else {
            pbtscan_core::Error::ShortFrame {
                expected: HEADER_SIZE,
                actual: buf.len(),
            }
        };
        Err(err.into())
    }

    /// Read the LF separator and then `len` payload bytes
    ///
    /// A stream that goes quiet or closes before `len` bytes yields a
    /// truncated payload holding exactly what arrived.
    pub async fn read_payload(&mut self, len: usize) -> Result<ImagePayload> {
        let separator = self.read_payload_chunk(1).await?;
        match separator.first() {
            Some(&LF) => {}
            Some(&other) => warn!("Expected LF before payload, discarded 0x{:02X}", other),
            None => {
                warn!("Timed out waiting for payload of {} bytes", len);
                return Ok(ImagePayload::new(Bytes::new(), len));
            }
        }

        let mut data = BytesMut::with_capacity(len);
        while data.len() < len {
            if self.shutdown.is_triggered() {
                return Err(Error::Cancelled);
            }

            let chunk = self.read_payload_chunk(len - data.len()).await?;
            if chunk.is_empty() {
                break;
            }
            data.extend_from_slice(&chunk);
            trace!("Payload progress {}/{}", data.len(), len);
        }

        let payload = ImagePayload::new(data.freeze(), len);
        if payload.is_truncated() {
            warn!(
                "{}",
                pbtscan_core::Error::ShortFrame {
                    expected: len,
                    actual: payload.len(),
                }
            );
        }

        Ok(payload)
    }

    /// A closed stream ends the payload like a silent one
    async fn read_payload_chunk(&mut self, n: usize) -> Result<BytesMut> {
        match self.transport.read_exact(n).await {
            Err(pbtscan_transport::Error::ConnectionClosed) => {
                warn!("Stream closed during payload");
                Ok(BytesMut::new())
            }
            other => Ok(other?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbtscan_transport::MemoryTransport;
    use pretty_assertions::assert_eq;

    async fn open(transport: &MemoryTransport) -> MemoryTransport {
        let mut transport = transport.clone();
        transport.open().await.unwrap();
        transport
    }

    #[tokio::test]
    async fn test_barcode_excludes_terminator() {
        let handle = MemoryTransport::new();
        handle.push(&b"ABC123\r"[..]);
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let barcode = FrameReader::new(&mut transport, &signal).read_barcode().await.unwrap();
        assert_eq!(barcode.as_bytes(), b"ABC123");
        assert_eq!(barcode.label(), "ABC123");
    }

    #[tokio::test]
    async fn test_barcode_survives_idle_timeouts() {
        let handle = MemoryTransport::new();
        handle.stall().stall().push(&b"AB"[..]).stall().push(&b"C\rXX"[..]);
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let barcode = FrameReader::new(&mut transport, &signal).read_barcode().await.unwrap();
        assert_eq!(barcode.label(), "ABC");
        assert_eq!(handle.pending(), 2);
    }

    #[tokio::test]
    async fn test_empty_barcode() {
        let handle = MemoryTransport::new();
        handle.push(&b"\r"[..]);
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let barcode = FrameReader::new(&mut transport, &signal).read_barcode().await.unwrap();
        assert!(barcode.is_empty());
    }

    #[tokio::test]
    async fn test_barcode_cancelled() {
        let handle = MemoryTransport::new();
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();
        signal.trigger();

        let result = FrameReader::new(&mut transport, &signal).read_barcode().await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_metadata_across_timeouts() {
        let handle = MemoryTransport::new();
        handle.push(&b"x0080000"[..]).stall().stall().push(&b"0010    "[..]);
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let header = FrameReader::new(&mut transport, &signal)
            .read_metadata(3)
            .await
            .unwrap();
        assert_eq!(header.payload_len().unwrap(), 16);
    }

    #[tokio::test]
    async fn test_metadata_short_frame() {
        let handle = MemoryTransport::new();
        handle.push(&b"x0080000"[..]).stall().stall();
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let result = FrameReader::new(&mut transport, &signal).read_metadata(2).await;
        assert!(matches!(
            result,
            Err(Error::Core(pbtscan_core::Error::ShortFrame { expected: 16, actual: 8 }))
        ));
    }

    #[tokio::test]
    async fn test_metadata_timeout() {
        let handle = MemoryTransport::new();
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let result = FrameReader::new(&mut transport, &signal).read_metadata(3).await;
        assert!(matches!(
            result,
            Err(Error::Core(pbtscan_core::Error::Timeout { attempts: 4 }))
        ));
    }

    #[tokio::test]
    async fn test_payload_consumes_separator() {
        let handle = MemoryTransport::new();
        handle.push(&b"\n"[..]).push(vec![0xAB; 5]).push(vec![0xCD; 3]);
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let payload = FrameReader::new(&mut transport, &signal).read_payload(8).await.unwrap();
        assert!(!payload.is_truncated());
        assert_eq!(&payload.data()[..], &[0xAB, 0xAB, 0xAB, 0xAB, 0xAB, 0xCD, 0xCD, 0xCD]);
    }

    #[tokio::test]
    async fn test_payload_truncated() {
        let handle = MemoryTransport::new();
        handle.push(&b"\n"[..]).push(vec![1, 2, 3]).stall().stall().push(vec![9; 10]);
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let payload = FrameReader::new(&mut transport, &signal).read_payload(8).await.unwrap();
        assert!(payload.is_truncated());
        assert_eq!(payload.declared_len(), 8);
        assert_eq!(&payload.data()[..], &[1, 2, 3]);
        assert_eq!(handle.pending(), 10);
    }

    #[tokio::test]
    async fn test_payload_cut_by_stream_closure() {
        let handle = MemoryTransport::new();
        handle.push(&b"\n"[..]).push(vec![7; 10]).close_stream();
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let payload = FrameReader::new(&mut transport, &signal).read_payload(32).await.unwrap();
        assert!(payload.is_truncated());
        assert_eq!(payload.declared_len(), 32);
        assert_eq!(&payload.data()[..], &[7; 10]);
    }

    #[tokio::test]
    async fn test_barcode_noise_discarded() {
        let handle = MemoryTransport::new();
        handle
            .push(vec![b'N'; MAX_BARCODE_LEN + 10])
            .stall()
            .push(&b"OK\r"[..]);
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let barcode = FrameReader::new(&mut transport, &signal).read_barcode().await.unwrap();
        assert_eq!(barcode.label(), "OK");
    }

    #[tokio::test]
    async fn test_payload_without_separator() {
        let handle = MemoryTransport::new();
        let mut transport = open(&handle).await;
        let signal = ShutdownSignal::new();

        let payload = FrameReader::new(&mut transport, &signal).read_payload(4).await.unwrap();
        assert!(payload.is_empty());
        assert!(payload.is_truncated());
    }
}
