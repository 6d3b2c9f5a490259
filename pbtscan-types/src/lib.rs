//! Type definitions for pbtscan

pub mod barcode;
pub mod error;
pub mod payload;

pub use barcode::Barcode;
pub use error::{Error, Result};
pub use payload::ImagePayload;
