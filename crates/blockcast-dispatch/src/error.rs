//! Error types for connection pooling and dispatch.

use thiserror::Error;

/// Result type alias for dispatch operations.
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Errors raised while opening, using or closing pooled connections.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Invalid pool settings, e.g. a pool size of zero.
    #[error("configuration error: {0}")]
    Config(String),

    /// A pool connection could not be established at startup.
    #[error("failed to open connection {index} of {size}: {source}")]
    Connect {
        index: usize,
        size: usize,
        #[source]
        source: Box<DispatchError>,
    },

    /// A single command failed during dispatch.
    #[error("command {index} ({command:?}) failed: {source}")]
    Send {
        index: usize,
        command: String,
        #[source]
        source: Box<DispatchError>,
    },

    /// The server rejected the remote console password.
    #[error("authentication rejected by server")]
    Auth,

    /// The peer sent or was about to be sent a malformed packet.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The byte stream no longer lines up with packet boundaries; the
    /// connection cannot be used again.
    #[error("lost packet framing: {0}")]
    Framing(String),

    /// The pool's idle queue was disconnected.
    #[error("connection pool is closed")]
    PoolClosed,

    /// Socket I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a framing error.
    pub fn framing(msg: impl Into<String>) -> Self {
        Self::Framing(msg.into())
    }
}
