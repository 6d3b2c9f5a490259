//! Transport layer for the PBT9500 protocol
//!
//! Provides timeout-bounded byte I/O over the scanner's virtual COM port.

pub mod discovery;
pub mod error;
pub mod memory;
pub mod serial;

pub use discovery::resolve_port;
pub use error::{Error, Result};
pub use memory::{Inbound, MemoryTransport};
pub use serial::{SerialConfig, SerialTransport};

use async_trait::async_trait;
use bytes::BytesMut;

/// Bytes collected by [`Transport::read_until`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Until {
    /// Data read, terminator excluded
    pub data: BytesMut,

    /// Whether the terminator was seen before the read timed out
    pub terminated: bool,
}

/// Transport trait for the scanner's byte stream
///
/// Reads never fail on a timeout. They return whatever arrived, which may be
/// nothing, and callers decide what a short read means.
#[async_trait]
pub trait Transport: Send {
    /// Open the port
    async fn open(&mut self) -> Result<()>;

    /// Close the port
    async fn close(&mut self) -> Result<()>;

    /// Check if the port is open
    fn is_open(&self) -> bool;

    /// Write raw bytes
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `n` bytes
    ///
    /// Returns early with fewer bytes when the read timeout elapses without
    /// new data, or when the device closes the stream after sending some.
    /// A stream that is already closed yields [`Error::ConnectionClosed`].
    async fn read_exact(&mut self, n: usize) -> Result<BytesMut>;

    /// Read until `terminator`, a timeout, or `limit` bytes, whichever comes first
    async fn read_until(&mut self, terminator: u8, limit: usize) -> Result<Until> {
        let mut data = BytesMut::new();
        while data.len() < limit {
            let byte = self.read_exact(1).await?;
            match byte.first() {
                None => break,
                Some(&b) if b == terminator => return Ok(Until { data, terminated: true }),
                Some(&b) => data.extend_from_slice(&[b]),
            }
        }
        Ok(Until { data, terminated: false })
    }

    /// Discard any unread input
    async fn drain(&mut self) -> Result<()>;

    /// Port identifier, for logging
    fn port_name(&self) -> String;
}
