//! # pbtscan-core
//!
//! Core protocol implementation for PBT9500 barcode imagers.
//!
//! This crate provides the low-level protocol primitives:
//! - Command definitions and frame encoding
//! - Metadata header parsing
//! - Session state
//! - Protocol constants

pub mod command;
pub mod constants;
pub mod error;
pub mod header;
pub mod state;

pub use command::{Command, CommandFrame};
pub use error::{Error, Result};
pub use header::MetadataHeader;
pub use state::SessionState;

/// Protocol version information
pub const PROTOCOL_VERSION: &str = "1.0";

/// USB vendor id reported by the scanner's virtual COM port
pub const DEFAULT_VENDOR_ID: u16 = 1529;

/// Metadata header size
pub const HEADER_SIZE: usize = 16;
