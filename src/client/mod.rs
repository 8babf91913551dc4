//! Transport client contract.
//!
//! Concrete transports (TCP, UDP, serial and similar) implement
//! [`BytesClient`] to plug into the unpacker and the exchange engine. The
//! contract is notification driven: a transport reports inbound chunks via
//! [`BytesClient::data_received`] and connection loss via
//! [`BytesClient::disconnected`], from whatever thread or task runs its read
//! loop.

use std::{fmt, net::SocketAddr};

use bytes::Bytes;

mod config;
mod error;

pub use config::SendOptions;
pub use error::ClientError;

use crate::{disconnect::DisconnectEvent, listeners::Listeners};

/// Raw chunk reported by a transport.
///
/// Datagram transports attach the sender of each chunk; stream transports
/// usually leave it unset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataReceived {
    data: Bytes,
    peer: Option<SocketAddr>,
}

impl DataReceived {
    /// Chunk received from a connected stream.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            peer: None,
        }
    }

    /// Chunk received from `peer`.
    #[must_use]
    pub fn from_peer(data: impl Into<Bytes>, peer: SocketAddr) -> Self {
        Self {
            data: data.into(),
            peer: Some(peer),
        }
    }

    /// Received bytes.
    #[must_use]
    pub fn data(&self) -> &Bytes { &self.data }

    /// Remote address of the sender, if the transport reports one.
    #[must_use]
    pub fn peer(&self) -> Option<SocketAddr> { self.peer }
}

/// Byte-oriented client connection.
///
/// Implementations own two broadcast registries. They must emit every
/// received chunk on [`data_received`](Self::data_received) in arrival order
/// and emit exactly one [`DisconnectEvent`] per disconnection on
/// [`disconnected`](Self::disconnected), once
/// [`is_connected`](Self::is_connected) already reports `false`.
pub trait BytesClient: Send + Sync + 'static {
    /// Queue `data` for transmission.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the connection is down or the transport
    /// rejects the write.
    fn send(&self, data: Bytes, options: &SendOptions) -> Result<(), ClientError>;

    /// Whether the link is currently established.
    fn is_connected(&self) -> bool;

    /// Registry notified once per disconnection.
    fn disconnected(&self) -> &Listeners<DisconnectEvent>;

    /// Registry notified for every chunk read from the transport.
    fn data_received(&self) -> &Listeners<DataReceived>;
}

impl fmt::Debug for dyn BytesClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BytesClient")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
