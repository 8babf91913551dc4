//! Fixtures and timing helpers for driving a [`MemoryClient`].

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use bytesio::{
    DisconnectionReasonCode,
    FrameCodec,
    Unpacker,
    test_helpers::{MemoryClient, TagCodec},
};
use rstest::fixture;
use tokio::task::JoinHandle;

/// Build a connected client with a [`TagCodec`] unpacker bound to it.
#[must_use]
pub fn linked() -> (Arc<MemoryClient>, Arc<Unpacker<TagCodec>>) {
    let client = MemoryClient::shared();
    let unpacker = Unpacker::new(TagCodec::default());
    unpacker.bind(client.clone());
    (client, unpacker)
}

/// `rstest` fixture wrapping [`linked`].
#[fixture]
#[allow(
    unused_braces,
    reason = "Clippy is wrong here; this is not a redundant block"
)]
pub fn link() -> (Arc<MemoryClient>, Arc<Unpacker<TagCodec>>) { linked() }

/// Feed `data` into `unpacker` in pieces of at most `chunk` bytes.
///
/// A `chunk` of zero feeds everything in one call.
pub fn feed_chunked<K: FrameCodec>(unpacker: &Unpacker<K>, data: &[u8], chunk: usize) {
    let size = if chunk == 0 { data.len().max(1) } else { chunk };
    for piece in data.chunks(size) {
        unpacker.input(piece);
    }
}

/// Inject `data` into `client` once `delay` has elapsed.
pub fn inject_after(client: &Arc<MemoryClient>, delay: Duration, data: Bytes) -> JoinHandle<()> {
    let client = Arc::clone(client);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        client.inject(data);
    })
}

/// Disconnect `client` with `reason` once `delay` has elapsed.
///
/// The task yields `true` if this call performed the disconnect.
pub fn disconnect_after(
    client: &Arc<MemoryClient>,
    delay: Duration,
    reason: DisconnectionReasonCode,
) -> JoinHandle<bool> {
    let client = Arc::clone(client);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        client.disconnect(reason)
    })
}
