//! # pbtscan
//!
//! Driver for PBT9500 barcode imagers on a virtual COM port.
//!
//! ## Features
//!
//! - Barcode-triggered image capture over the device's ASCII protocol
//! - Async/await API using Tokio
//! - Recovery from malformed or truncated frames without dropping the session
//! - Background saving of captured images
//!
//! ## Quick Start
//!
//! ```no_run
//! use pbtscan::{resolve_port, ImageFileSink, Scanner, SerialConfig, SerialTransport};
//! use pbtscan_core::DEFAULT_VENDOR_ID;
//!
//! #[tokio::main]
//! async fn main() -> pbtscan::Result<()> {
//!     // Locate the scanner
//!     let port = resolve_port(DEFAULT_VENDOR_ID)?.expect("scanner attached");
//!     let transport = SerialTransport::new(SerialConfig::new(port));
//!
//!     let mut scanner = Scanner::new(transport, ImageFileSink::new("."));
//!     scanner.open().await?;
//!
//!     // Wait for one barcode and capture its image
//!     scanner.scan().await?;
//!
//!     scanner.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod persistence;
pub mod reader;
pub mod scanner;
pub mod shutdown;

// Re-exports
pub use config::ScannerConfig;
pub use error::{Error, Result};
pub use persistence::{ImageFileSink, Persistence, PersistenceError, Sink};
pub use reader::FrameReader;
pub use scanner::{ScanOutcome, Scanner, Stage};
pub use shutdown::ShutdownSignal;

// Re-export types
pub use pbtscan_core::{Command, CommandFrame, MetadataHeader, SessionState};
pub use pbtscan_transport::{resolve_port, MemoryTransport, SerialConfig, SerialTransport, Transport};
pub use pbtscan_types::{Barcode, ImagePayload};
