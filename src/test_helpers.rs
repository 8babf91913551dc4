//! Test-only helpers for shared test utilities.

pub mod frame_codec;
pub mod memory_client;

pub use frame_codec::{TagCodec, TagDecoder, TagFrame, encode_all};
pub use memory_client::MemoryClient;
