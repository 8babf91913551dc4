//! Errors reported on the unpacker's error channel.

use std::io;

use thiserror::Error;

/// Malformed input detected while reassembling frames.
///
/// Each error is reported once on the unpacker's error channel. The bytes
/// buffered at the time are discarded so that later input starts from a
/// clean frame boundary.
#[derive(Debug, Error)]
pub enum UnpackError {
    /// The decoder rejected the buffered bytes.
    #[error("failed to decode frame: {source}")]
    Decode {
        /// Decoder failure.
        #[source]
        source: io::Error,
        /// Bytes discarded alongside the failure.
        discarded: usize,
    },
    /// Buffered bytes exceeded the configured cap without forming a frame.
    #[error("reassembly buffer overflow: {buffered} > {max} bytes")]
    BufferOverflow {
        /// Bytes buffered when the cap was exceeded.
        buffered: usize,
        /// Configured cap.
        max: usize,
    },
}

impl UnpackError {
    /// Number of buffered bytes dropped because of this error.
    #[must_use]
    pub fn discarded(&self) -> usize {
        match self {
            Self::Decode { discarded, .. } => *discarded,
            Self::BufferOverflow { buffered, .. } => *buffered,
        }
    }
}
