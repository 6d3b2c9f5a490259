//! Serial (virtual COM) transport

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use pbtscan_core::constants::{BAUD_RATE, DEFAULT_READ_TIMEOUT};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, trace, warn};

use crate::{error::*, Transport};

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Port name (e.g., COM3, /dev/ttyACM0)
    pub port: String,
    /// Fixed by the device; USB ignores it but the OS wants one
    baud_rate: u32,
    /// Longest wait for the next byte
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Create a configuration with the device's fixed line settings
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: BAUD_RATE,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT),
        }
    }

    /// Line speed the port is opened with
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Set read timeout
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Serial transport bound to one port
pub struct SerialTransport {
    config: SerialConfig,
    stream: Option<SerialStream>,
}

impl SerialTransport {
    /// Create new serial transport (port stays closed until [`Transport::open`])
    pub fn new(config: SerialConfig) -> Self {
        Self { config, stream: None }
    }

    /// Configured read timeout
    pub fn read_timeout(&self) -> Duration {
        self.config.read_timeout
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }

        debug!("Opening {} at {} baud...", self.config.port, self.config.baud_rate);

        let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(self.config.read_timeout)
            .open_native_async()
            .map_err(|source| Error::PortUnavailable {
                port: self.config.port.clone(),
                source,
            })?;

        debug!("Opened {}", self.config.port);

        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Closing {}...", self.config.port);
            let _ = stream.flush().await;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);

        stream.write_all(data).await?;
        stream.flush().await?;

        Ok(())
    }

    async fn read_exact(&mut self, n: usize) -> Result<BytesMut> {
        let read_timeout = self.config.read_timeout;
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let mut buf = BytesMut::with_capacity(n);
        let mut chunk = vec![0u8; n.min(4096)];

        while buf.len() < n {
            let want = (n - buf.len()).min(chunk.len());

            // The timeout restarts whenever a byte arrives
            let read = match timeout(read_timeout, stream.read(&mut chunk[..want])).await {
                Ok(read) => read?,
                Err(_) => {
                    trace!("Read timed out with {}/{} bytes", buf.len(), n);
                    break;
                }
            };

            if read == 0 {
                if buf.is_empty() {
                    return Err(Error::ConnectionClosed);
                }
                debug!("Stream closed after {}/{} bytes", buf.len(), n);
                break;
            }

            buf.extend_from_slice(&chunk[..read]);
        }

        trace!("Received {} bytes: {:02X?}", buf.len(), &buf[..buf.len().min(16)]);

        Ok(buf)
    }

    async fn drain(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        let pending = stream.bytes_to_read().unwrap_or(0);
        if pending > 0 {
            debug!("Discarding {} residual bytes", pending);
        }
        stream
            .clear(ClearBuffer::Input)
            .map_err(|e| Error::Io(e.into()))?;
        Ok(())
    }

    fn port_name(&self) -> String {
        self.config.port.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Serial transport dropped while {} still open", self.config.port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyACM0");
        assert_eq!(config.baud_rate(), 9600);
        assert_eq!(config.read_timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_serial_transport_create() {
        let transport = SerialTransport::new(SerialConfig::new("COM3"));
        assert!(!transport.is_open());
        assert_eq!(transport.port_name(), "COM3");
    }

    #[tokio::test]
    async fn test_serial_transport_missing_port() {
        let mut transport = SerialTransport::new(SerialConfig::new("/dev/pbtscan-does-not-exist"));
        let result = transport.open().await;
        assert!(matches!(result, Err(Error::PortUnavailable { .. })));
        assert!(!transport.is_open());
    }

    // Requires a scanner; set PBTSCAN_PORT to its port
    #[tokio::test]
    #[ignore] // Only run with real device
    async fn test_serial_transport_real_device() {
        let port = std::env::var("PBTSCAN_PORT").unwrap_or_else(|_| "COM7".to_string());
        let mut transport = SerialTransport::new(SerialConfig::new(port));

        transport.open().await.unwrap();
        assert!(transport.is_open());

        transport.write(b"x040000000000\r\n").await.unwrap();
        transport.drain().await.unwrap();

        // An idle device stays silent: the read times out empty
        let idle = transport.read_exact(1).await.unwrap();
        assert!(idle.is_empty());

        transport.close().await.unwrap();
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_io_requires_open_port() {
        let mut transport = SerialTransport::new(SerialConfig::new("COM3"));
        assert!(matches!(transport.write(b"x").await, Err(Error::NotConnected)));
        assert!(matches!(transport.read_exact(1).await, Err(Error::NotConnected)));
        assert!(matches!(transport.drain().await, Err(Error::NotConnected)));
    }
}
