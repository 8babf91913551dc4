//! Tag/length test codec shared across unit and integration tests.
//!
//! Wire layout of one frame:
//!
//! ```text
//! +---------+-----------+------------------+---------+
//! | tag len | tag bytes | payload len (BE) | payload |
//! |   u8    |  UTF-8    |       u16        |         |
//! +---------+-----------+------------------+---------+
//! ```

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::{
    codec::FrameCodec,
    request::{BoxError, Request},
};

const TAG_LEN_SIZE: usize = 1;
const PAYLOAD_LEN_SIZE: usize = 2;

/// Test frame carrying a textual tag and an opaque payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagFrame {
    /// Tag identifying the message kind, for example `PING`.
    pub tag: String,
    /// Payload bytes carried by the frame.
    pub payload: Bytes,
}

impl TagFrame {
    /// Build a frame from a tag and payload.
    #[must_use]
    pub fn new(tag: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            tag: tag.into(),
            payload: payload.into(),
        }
    }

    /// Build a frame with an empty payload.
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self { Self::new(tag, Bytes::new()) }

    /// Encode the frame into its wire representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is empty or longer than 255 bytes, or the
    /// payload exceeds `u16::MAX` bytes.
    pub fn encode(&self) -> io::Result<Bytes> {
        if self.tag.is_empty() {
            return Err(invalid_input("tag must not be empty"));
        }
        let tag_len = u8::try_from(self.tag.len()).map_err(|_| invalid_input("tag too long"))?;
        let payload_len =
            u16::try_from(self.payload.len()).map_err(|_| invalid_input("payload too long"))?;

        let mut dst = BytesMut::with_capacity(
            TAG_LEN_SIZE + self.tag.len() + PAYLOAD_LEN_SIZE + self.payload.len(),
        );
        dst.put_u8(tag_len);
        dst.extend_from_slice(self.tag.as_bytes());
        dst.put_u16(payload_len);
        dst.extend_from_slice(&self.payload);
        Ok(dst.freeze())
    }
}

impl Request for TagFrame {
    fn to_bytes(&self) -> Result<Bytes, BoxError> { Ok(self.encode()?) }
}

/// Codec producing [`TagFrame`]s.
#[derive(Clone, Copy, Debug)]
pub struct TagCodec {
    max_payload: usize,
}

impl TagCodec {
    /// Create a codec rejecting payloads longer than `max_payload` bytes.
    #[must_use]
    pub fn new(max_payload: usize) -> Self { Self { max_payload } }
}

impl Default for TagCodec {
    fn default() -> Self { Self::new(1024) }
}

/// Decoder half of [`TagCodec`].
#[derive(Clone, Copy, Debug)]
pub struct TagDecoder {
    max_payload: usize,
}

impl Decoder for TagDecoder {
    type Item = TagFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(&tag_len) = src.first() else {
            return Ok(None);
        };
        let tag_len = usize::from(tag_len);
        if tag_len == 0 {
            return Err(invalid_data("empty tag"));
        }
        let header_len = TAG_LEN_SIZE + tag_len + PAYLOAD_LEN_SIZE;
        if src.len() < header_len {
            return Ok(None);
        }

        let mut header = &src[TAG_LEN_SIZE + tag_len..header_len];
        let payload_len = usize::from(header.get_u16());
        if payload_len > self.max_payload {
            return Err(invalid_data("payload too large"));
        }
        if src.len() < header_len + payload_len {
            return Ok(None);
        }

        let mut frame = src.split_to(header_len + payload_len);
        frame.advance(TAG_LEN_SIZE);
        let tag = frame.split_to(tag_len);
        let tag = String::from_utf8(tag.to_vec()).map_err(|_| invalid_data("tag is not UTF-8"))?;
        frame.advance(PAYLOAD_LEN_SIZE);

        Ok(Some(TagFrame {
            tag,
            payload: frame.freeze(),
        }))
    }
}

impl FrameCodec for TagCodec {
    type Frame = TagFrame;
    type Decoder = TagDecoder;

    fn decoder(&self) -> Self::Decoder {
        TagDecoder {
            max_payload: self.max_payload,
        }
    }
}

/// Encode `frames` back to back into one buffer.
///
/// # Panics
///
/// Panics if any frame cannot be encoded.
#[must_use]
pub fn encode_all(frames: &[TagFrame]) -> Bytes {
    let mut buf = BytesMut::new();
    for frame in frames {
        buf.extend_from_slice(&frame.encode().expect("test frame must encode"));
    }
    buf.freeze()
}

fn invalid_data(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn invalid_input(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}
