//! Precondition failures raised before an exchange starts.

use thiserror::Error;

/// Programmer errors detected before any I/O is attempted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentError {
    /// The unpacker has no client to send on.
    #[error("unpacker is not bound to a client")]
    Unbound,
}
