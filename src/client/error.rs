//! Error types for transport client operations.

use std::io;

/// Errors reported by [`BytesClient::send`](super::BytesClient::send).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The link is not established.
    #[error("client is not connected")]
    NotConnected,
    /// The transport was shut down and accepts no further writes.
    #[error("client is closed")]
    Closed,
    /// Transport-level I/O failure.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}
