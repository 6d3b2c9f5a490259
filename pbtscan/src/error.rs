//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] pbtscan_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] pbtscan_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] pbtscan_types::Error),

    #[error("Scanner not connected")]
    NotConnected,

    #[error("Scanner port unavailable: {0}")]
    PortUnavailable(String),

    #[error("Scan cancelled")]
    Cancelled,
}
