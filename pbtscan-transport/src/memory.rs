//! In-memory transport
//!
//! Replays a scripted inbound stream and records everything written, for
//! exercising the session without a device. Clones share state, so a test
//! can keep a handle after moving the transport into a scanner.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::trace;

use crate::{error::*, Transport};

/// One step of the scripted inbound stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Bytes available to read
    Data(Bytes),

    /// One read timeout: the pending read returns what it has so far
    Stall,

    /// Device closed the stream; every later read sees the closure
    Closed,
}

#[derive(Debug, Default)]
struct Inner {
    open: bool,
    inbound: VecDeque<Inbound>,
    written: Vec<Bytes>,
    failing_write: Option<Bytes>,
    opens: usize,
    closes: usize,
}

/// Scripted transport
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTransport {
    /// Create a closed transport with nothing to read
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for reading
    pub fn push(&self, data: impl Into<Bytes>) -> &Self {
        self.inner.lock().inbound.push_back(Inbound::Data(data.into()));
        self
    }

    /// Queue one read timeout
    pub fn stall(&self) -> &Self {
        self.inner.lock().inbound.push_back(Inbound::Stall);
        self
    }

    /// Mark the end of the stream
    pub fn close_stream(&self) -> &Self {
        self.inner.lock().inbound.push_back(Inbound::Closed);
        self
    }

    /// Make every write equal to `frame` fail with an I/O error
    pub fn fail_writes_of(&self, frame: &[u8]) {
        self.inner.lock().failing_write = Some(Bytes::copy_from_slice(frame));
    }

    /// Let all writes succeed again
    pub fn clear_write_failure(&self) {
        self.inner.lock().failing_write = None;
    }

    /// Every write so far, one entry per call
    pub fn written(&self) -> Vec<Bytes> {
        self.inner.lock().written.clone()
    }

    /// Number of writes equal to `frame`
    pub fn count_written(&self, frame: &[u8]) -> usize {
        self.inner
            .lock()
            .written
            .iter()
            .filter(|w| w.as_ref() == frame)
            .count()
    }

    /// Forget recorded writes
    pub fn clear_written(&self) {
        self.inner.lock().written.clear();
    }

    /// Number of successful `open` calls
    pub fn opens(&self) -> usize {
        self.inner.lock().opens
    }

    /// Number of `close` calls on an open port
    pub fn closes(&self) -> usize {
        self.inner.lock().closes
    }

    /// Bytes still queued (stalls excluded)
    pub fn pending(&self) -> usize {
        self.inner
            .lock()
            .inbound
            .iter()
            .map(|step| match step {
                Inbound::Data(data) => data.len(),
                Inbound::Stall | Inbound::Closed => 0,
            })
            .sum()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.open {
            return Err(Error::AlreadyConnected);
        }
        inner.open = true;
        inner.opens += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.open {
            inner.open = false;
            inner.closes += 1;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(Error::NotConnected);
        }
        if inner.failing_write.as_deref() == Some(data) {
            return Err(Error::Io(std::io::Error::other("write failed")));
        }
        trace!("Memory write {:02X?}", data);
        inner.written.push(Bytes::copy_from_slice(data));
        Ok(())
    }

    async fn read_exact(&mut self, n: usize) -> Result<BytesMut> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(Error::NotConnected);
        }

        let mut buf = BytesMut::with_capacity(n);
        while buf.len() < n {
            match inner.inbound.pop_front() {
                // An exhausted script behaves like a silent device
                None | Some(Inbound::Stall) => break,
                Some(Inbound::Closed) => {
                    inner.inbound.push_front(Inbound::Closed);
                    if buf.is_empty() {
                        return Err(Error::ConnectionClosed);
                    }
                    break;
                }
                Some(Inbound::Data(mut data)) => {
                    let take = (n - buf.len()).min(data.len());
                    buf.extend_from_slice(&data.split_to(take));
                    if !data.is_empty() {
                        inner.inbound.push_front(Inbound::Data(data));
                    }
                }
            }
        }

        Ok(buf)
    }

    /// Discards data up to the next scripted stall, which marks bytes that
    /// have not "arrived" yet
    async fn drain(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.open {
            return Err(Error::NotConnected);
        }
        while matches!(inner.inbound.front(), Some(Inbound::Data(_))) {
            inner.inbound.pop_front();
        }
        Ok(())
    }

    fn port_name(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn open_transport() -> MemoryTransport {
        let mut transport = MemoryTransport::new();
        transport.open().await.unwrap();
        transport
    }

    #[tokio::test]
    async fn test_read_exact_spans_chunks() {
        let mut transport = open_transport().await;
        transport.push(&b"abc"[..]).push(&b"defg"[..]);

        assert_eq!(&transport.read_exact(5).await.unwrap()[..], b"abcde");
        assert_eq!(&transport.read_exact(5).await.unwrap()[..], b"fg");
        assert_eq!(transport.pending(), 0);
    }

    #[tokio::test]
    async fn test_stall_shortens_read() {
        let mut transport = open_transport().await;
        transport.push(&b"ab"[..]).stall().push(&b"cd"[..]);

        assert_eq!(&transport.read_exact(4).await.unwrap()[..], b"ab");
        assert_eq!(&transport.read_exact(4).await.unwrap()[..], b"cd");
    }

    #[tokio::test]
    async fn test_read_until_excludes_terminator() {
        let mut transport = open_transport().await;
        transport.push(&b"ABC123\rrest"[..]);

        let until = transport.read_until(b'\r', 64).await.unwrap();
        assert!(until.terminated);
        assert_eq!(&until.data[..], b"ABC123");
        assert_eq!(transport.pending(), 4);
    }

    #[tokio::test]
    async fn test_read_until_timeout_returns_partial() {
        let mut transport = open_transport().await;
        transport.push(&b"AB"[..]).stall().push(&b"C\r"[..]);

        let first = transport.read_until(b'\r', 64).await.unwrap();
        assert!(!first.terminated);
        assert_eq!(&first.data[..], b"AB");

        let second = transport.read_until(b'\r', 64).await.unwrap();
        assert!(second.terminated);
        assert_eq!(&second.data[..], b"C");
    }

    #[tokio::test]
    async fn test_closed_stream_keeps_partial_read() {
        let mut transport = open_transport().await;
        transport.push(&b"abc"[..]).close_stream();

        assert_eq!(&transport.read_exact(8).await.unwrap()[..], b"abc");
        assert!(matches!(transport.read_exact(8).await, Err(Error::ConnectionClosed)));
        assert!(matches!(transport.read_exact(1).await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_read_until_stops_at_limit() {
        let mut transport = open_transport().await;
        transport.push(&b"ABCDEF\r"[..]);

        let until = transport.read_until(b'\r', 4).await.unwrap();
        assert!(!until.terminated);
        assert_eq!(&until.data[..], b"ABCD");
        assert_eq!(transport.pending(), 3);
    }

    #[tokio::test]
    async fn test_failing_write() {
        let mut transport = open_transport().await;
        transport.fail_writes_of(b"bad");

        assert!(matches!(transport.write(b"bad").await, Err(Error::Io(_))));
        transport.write(b"good").await.unwrap();
        transport.clear_write_failure();
        transport.write(b"bad").await.unwrap();
        assert_eq!(transport.count_written(b"bad"), 1);
    }

    #[tokio::test]
    async fn test_drain_stops_at_stall() {
        let mut transport = open_transport().await;
        transport.push(&b"junk"[..]).stall().push(&b"next"[..]);

        transport.drain().await.unwrap();
        assert_eq!(transport.pending(), 4);
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_io() {
        let mut transport = MemoryTransport::new();
        assert!(matches!(transport.write(b"x").await, Err(Error::NotConnected)));
        assert!(matches!(transport.read_exact(1).await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let handle = MemoryTransport::new();
        let mut transport = handle.clone();
        transport.open().await.unwrap();
        transport.write(b"hello").await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(handle.count_written(b"hello"), 1);
        assert_eq!(handle.opens(), 1);
        assert_eq!(handle.closes(), 1);
    }
}
