//! Pluggable frame decoders.
//!
//! A [`FrameCodec`] describes how a raw byte stream splits into frames. The
//! [`Unpacker`](crate::unpacker::Unpacker) drives the codec's decoder over its
//! reassembly buffer; the codec itself never sees the transport.
//!
//! Decoders follow the `tokio_util` contract:
//!
//! - return `Ok(None)` and leave the buffer untouched while a frame is
//!   incomplete;
//! - consume exactly the bytes of one frame when returning `Ok(Some(_))`;
//! - return `Err` for input that can never form a valid frame.
//!
//! Framing rules are protocol specific, so the crate ships no general
//! purpose codec.

use std::io;

use tokio_util::codec::Decoder;

/// Trait for pluggable frame codecs supporting different wire protocols.
///
/// Implementors define their own `Frame` type (for example, a struct carrying
/// a command tag) and produce fresh decoder instances on demand. A fresh
/// decoder is requested whenever the unpacker discards its state after a
/// decode failure or a rebinding.
pub trait FrameCodec: Send + Sync + 'static {
    /// Frame type produced by decoding.
    type Frame: Clone + Send + Sync + 'static;
    /// Decoder type for this codec.
    type Decoder: Decoder<Item = Self::Frame, Error = io::Error> + Send;

    /// Create a decoder in its initial state.
    fn decoder(&self) -> Self::Decoder;
}

/// Codec built from a decoder factory closure.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use bytesio::codec::{FnCodec, FrameCodec};
/// use tokio_util::codec::{Decoder, LinesCodec};
///
/// # fn main() -> std::io::Result<()> {
/// struct Lines(LinesCodec);
///
/// impl Decoder for Lines {
///     type Item = String;
///     type Error = std::io::Error;
///
///     fn decode(&mut self, src: &mut BytesMut) -> std::io::Result<Option<String>> {
///         self.0.decode(src).map_err(std::io::Error::other)
///     }
/// }
///
/// let codec = FnCodec::new(|| Lines(LinesCodec::new()));
/// let mut decoder = codec.decoder();
/// let mut buf = BytesMut::from(&b"PONG\n"[..]);
/// assert_eq!(decoder.decode(&mut buf)?, Some("PONG".to_string()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct FnCodec<F> {
    factory: F,
}

impl<F> FnCodec<F> {
    /// Wrap a decoder factory.
    #[must_use]
    pub fn new(factory: F) -> Self { Self { factory } }
}

impl<F, D> FrameCodec for FnCodec<F>
where
    F: Fn() -> D + Send + Sync + 'static,
    D: Decoder<Error = io::Error> + Send,
    D::Item: Clone + Send + Sync + 'static,
{
    type Frame = D::Item;
    type Decoder = D;

    fn decoder(&self) -> Self::Decoder { (self.factory)() }
}
