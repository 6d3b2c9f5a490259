//! High-level scanner session

use std::fmt;

use pbtscan_core::{Command, MetadataHeader, SessionState};
use pbtscan_transport::Transport;
use pbtscan_types::Barcode;
use tracing::{debug, info, warn};

use crate::{
    config::ScannerConfig,
    error::{Error, Result},
    persistence::{Persistence, Sink},
    reader::FrameReader,
    shutdown::ShutdownSignal,
};

/// Step of a capture cycle, reported with failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reset,
    Barcode,
    Trigger,
    Metadata,
    Payload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reset => "reset",
            Self::Barcode => "barcode",
            Self::Trigger => "trigger",
            Self::Metadata => "metadata",
            Self::Payload => "payload",
        };
        f.write_str(name)
    }
}

/// Result of one [`Scanner::scan`] cycle
#[derive(Debug)]
pub enum ScanOutcome {
    /// Image read and queued for saving
    Captured {
        barcode: Barcode,
        declared: usize,
        received: usize,
        truncated: bool,
    },

    /// Device reported an empty barcode
    NoBarcode,

    /// Cycle aborted; the device has been reset
    Failed { stage: Stage, error: Error },

    /// Shutdown requested while waiting; no reset was sent
    Cancelled,
}

/// PBT9500 scanner session
///
/// Owns the transport and drives the reset → barcode → capture → reset
/// cycle. Captured images go to a [`Sink`] in the background.
///
/// # Examples
///
/// ```no_run
/// use pbtscan::{ImageFileSink, Scanner, SerialConfig, SerialTransport};
///
/// #[tokio::main]
/// async fn main() -> pbtscan::Result<()> {
///     let transport = SerialTransport::new(SerialConfig::new("COM7"));
///     let mut scanner = Scanner::new(transport, ImageFileSink::new("images"));
///
///     scanner.open().await?;
///     let outcome = scanner.scan().await?;
///     println!("{:?}", outcome);
///
///     scanner.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct Scanner {
    transport: Box<dyn Transport>,
    state: SessionState,
    config: ScannerConfig,
    persistence: Persistence,
    shutdown: ShutdownSignal,
}

impl Scanner {
    /// Create a disconnected scanner
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the persistence
    /// worker is spawned here.
    pub fn new(transport: impl Transport + 'static, sink: impl Sink) -> Self {
        Self {
            transport: Box::new(transport),
            state: SessionState::Disconnected,
            config: ScannerConfig::default(),
            persistence: Persistence::spawn(sink),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Set session configuration
    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.state.is_connected() && self.transport.is_open()
    }

    /// Handle for cancelling a blocked [`Scanner::scan`] from elsewhere
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Open the port and reset the device
    ///
    /// Does nothing if already connected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortUnavailable`] if the port cannot be opened.
    pub async fn open(&mut self) -> Result<()> {
        if self.state.is_connected() {
            debug!("Scanner already open on {}", self.transport.port_name());
            return Ok(());
        }

        info!("Opening scanner on {}...", self.transport.port_name());

        if !self.transport.is_open() {
            self.transport.open().await.map_err(|e| match e {
                pbtscan_transport::Error::PortUnavailable { .. } => {
                    Error::PortUnavailable(e.to_string())
                }
                other => Error::Transport(other),
            })?;
        }

        if let Err(e) = self.reset().await {
            warn!("Initial reset failed: {}", e);
            let _ = self.transport.close().await;
            self.state = SessionState::Disconnected;
            return Err(e);
        }

        info!("Scanner ready on {}", self.transport.port_name());
        Ok(())
    }

    /// Send Reset, drain leftover output and return to idle
    ///
    /// A closed port makes this a no-op.
    pub async fn reset(&mut self) -> Result<()> {
        if !self.transport.is_open() {
            debug!("Reset skipped: port closed");
            return Ok(());
        }

        if self.config.reopen_on_reset {
            debug!("Reopening {}", self.transport.port_name());
            self.transport.close().await?;
            if let Err(e) = self.transport.open().await {
                self.state = SessionState::Disconnected;
                return Err(e.into());
            }
        }

        self.send(Command::Reset).await?;

        if !self.config.reset_settle.is_zero() {
            tokio::time::sleep(self.config.reset_settle).await;
        }
        self.transport.drain().await?;

        self.state = SessionState::Idle;
        Ok(())
    }

    /// Run one capture cycle
    ///
    /// Blocks until the device reports a barcode, then captures and queues
    /// the image. Framing and I/O failures are logged and reported in the
    /// outcome; every outcome except [`ScanOutcome::Cancelled`] ends with a
    /// reset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the scanner is not open.
    pub async fn scan(&mut self) -> Result<ScanOutcome> {
        match self.state {
            SessionState::Disconnected => return Err(Error::NotConnected),
            SessionState::Idle => {}
            other => {
                warn!("Scan requested while {}, resetting first", other);
                if let Err(error) = self.reset().await {
                    warn!(stage = %Stage::Reset, "Capture cycle failed: {}", error);
                    return Ok(ScanOutcome::Failed {
                        stage: Stage::Reset,
                        error,
                    });
                }
            }
        }

        let outcome = match self.capture().await {
            Ok(outcome) => outcome,
            Err((_, Error::Cancelled)) => {
                info!("Scan cancelled");
                return Ok(ScanOutcome::Cancelled);
            }
            Err((stage, error)) => {
                warn!(%stage, "Capture cycle failed: {}", error);
                ScanOutcome::Failed { stage, error }
            }
        };

        if let Err(e) = self.reset().await {
            warn!("Reset after scan failed: {}", e);
        }

        Ok(outcome)
    }

    /// Reset the device and release the port
    ///
    /// Safe to call repeatedly.
    pub async fn close(&mut self) -> Result<()> {
        if !self.state.is_connected() && !self.transport.is_open() {
            return Ok(());
        }

        info!("Closing scanner on {}...", self.transport.port_name());

        if let Err(e) = self.reset().await {
            warn!("Failed to reset before close: {}", e);
        }

        self.transport.close().await?;
        self.state = SessionState::Disconnected;

        info!("Closed");
        Ok(())
    }

    /// Close and wait for queued images to be saved
    pub async fn shutdown(mut self) -> Result<()> {
        let closed = self.close().await;
        self.persistence.finish().await;
        closed
    }

    // Helper methods

    fn reader(&mut self) -> FrameReader<'_> {
        FrameReader::new(&mut *self.transport, &self.shutdown)
    }

    async fn send(&mut self, command: Command) -> Result<()> {
        debug!("Sending {}", command);
        self.transport.write(command.encode().as_bytes()).await?;
        Ok(())
    }

    async fn read_header(&mut self) -> Result<MetadataHeader> {
        if !self.state.expects_header() {
            return Err(pbtscan_core::Error::InvalidSessionState(format!(
                "metadata read while {}",
                self.state
            ))
            .into());
        }

        let retries = self.config.metadata_retries;
        self.reader().read_metadata(retries).await
    }

    async fn capture(&mut self) -> std::result::Result<ScanOutcome, (Stage, Error)> {
        let barcode = self
            .reader()
            .read_barcode()
            .await
            .map_err(|e| (Stage::Barcode, e))?;

        if barcode.is_empty() {
            debug!("Empty barcode, device still idle");
            return Ok(ScanOutcome::NoBarcode);
        }

        info!(barcode = %barcode, "Barcode read, capturing image");

        self.state = SessionState::Capturing;
        self.send(Command::CaptureImage)
            .await
            .map_err(|e| (Stage::Trigger, e))?;

        let declared = self
            .read_header()
            .await
            .and_then(|header| Ok(header.payload_len()?))
            .and_then(|len| self.check_payload_len(len))
            .map_err(|e| (Stage::Metadata, e))?;

        debug!("Expecting {} payload bytes", declared);

        let payload = self
            .reader()
            .read_payload(declared)
            .await
            .map_err(|e| (Stage::Payload, e))?;

        let received = payload.len();
        let truncated = payload.is_truncated();

        self.state = SessionState::Saving;
        if !self.persistence.dispatch(payload, barcode.label()) {
            warn!(barcode = %barcode, "Persistence worker stopped, image dropped");
        }

        info!(
            barcode = %barcode,
            "Captured {}/{} bytes{}",
            received,
            declared,
            if truncated { " (truncated)" } else { "" }
        );

        Ok(ScanOutcome::Captured {
            barcode,
            declared,
            received,
            truncated,
        })
    }

    fn check_payload_len(&self, len: usize) -> Result<usize> {
        if len > self.config.max_payload_len {
            return Err(pbtscan_core::Error::PayloadTooLarge {
                size: len,
                max: self.config.max_payload_len,
            }
            .into());
        }
        Ok(len)
    }
}
