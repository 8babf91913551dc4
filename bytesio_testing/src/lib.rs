//! Utilities for exercising `bytesio` unpackers and exchanges without a
//! real transport.
//!
//! The in-memory [`MemoryClient`] stands in for a socket, and [`TagCodec`]
//! provides a tiny tag/length framing so tests can speak in named frames.
//!
//! ```rust
//! use bytesio_testing::{TagFrame, encode_all, linked};
//!
//! let (client, unpacker) = linked();
//! client.inject(encode_all(&[TagFrame::tag("STATUS")]));
//! assert_eq!(unpacker.buffered(), 0);
//! ```

pub mod helpers;
pub mod metrics;

pub use bytesio::test_helpers::{MemoryClient, TagCodec, TagDecoder, TagFrame, encode_all};
pub use helpers::{disconnect_after, feed_chunked, inject_after, link, linked};
pub use metrics::{Counters, recorder};
