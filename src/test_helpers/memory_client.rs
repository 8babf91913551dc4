//! In-memory [`BytesClient`] used to exercise the unpacker and exchanges.

use std::{
    io,
    net::SocketAddr,
    sync::{
        Arc,
        Mutex,
        PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::Bytes;

use crate::{
    client::{BytesClient, ClientError, DataReceived, SendOptions},
    disconnect::{DisconnectEvent, DisconnectionReasonCode},
    listeners::Listeners,
};

type Responder = Arc<dyn Fn(&Bytes) -> Vec<Bytes> + Send + Sync>;

/// Loopback transport recording writes and replaying scripted replies.
///
/// Replies produced by the responder are injected synchronously from inside
/// [`send`](BytesClient::send), mimicking a peer that answers faster than
/// the sender can start waiting.
pub struct MemoryClient {
    connected: AtomicBool,
    fail_sends: AtomicBool,
    sent: Mutex<Vec<(Bytes, SendOptions)>>,
    responder: Mutex<Option<Responder>>,
    disconnected: Listeners<DisconnectEvent>,
    data_received: Listeners<DataReceived>,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self {
            connected: AtomicBool::new(true),
            fail_sends: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            responder: Mutex::new(None),
            disconnected: Listeners::new(),
            data_received: Listeners::new(),
        }
    }
}

impl MemoryClient {
    /// Create a connected client.
    #[must_use]
    pub fn connected() -> Self { Self::default() }

    /// Create a connected client behind an `Arc`.
    #[must_use]
    pub fn shared() -> Arc<Self> { Arc::new(Self::default()) }

    /// Answer every send with the chunks returned by `responder`.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&Bytes) -> Vec<Bytes> + Send + Sync + 'static,
    {
        *self.responder.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(responder));
    }

    /// Make subsequent sends fail with a broken pipe.
    pub fn fail_sends(&self, enabled: bool) { self.fail_sends.store(enabled, Ordering::SeqCst); }

    /// Deliver `data` as if read from the transport.
    pub fn inject(&self, data: impl Into<Bytes>) { self.data_received.emit(&DataReceived::new(data)); }

    /// Deliver a datagram received from `peer`.
    pub fn inject_from(&self, data: impl Into<Bytes>, peer: SocketAddr) {
        self.data_received.emit(&DataReceived::from_peer(data, peer));
    }

    /// Drop the link and notify listeners once.
    ///
    /// Returns `false` if the client was already disconnected.
    pub fn disconnect(&self, reason: DisconnectionReasonCode) -> bool {
        self.disconnect_with(DisconnectEvent::new(reason))
    }

    /// Drop the link with a fully specified event.
    pub fn disconnect_with(&self, event: DisconnectEvent) -> bool {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.disconnected.emit(&event);
        true
    }

    /// Mark the link as established again.
    pub fn reconnect(&self) { self.connected.store(true, Ordering::SeqCst); }

    /// Payloads written so far, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<Bytes> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(data, _)| data.clone())
            .collect()
    }

    /// Options passed with each send, in send order.
    #[must_use]
    pub fn sent_options(&self) -> Vec<SendOptions> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, options)| *options)
            .collect()
    }
}

impl BytesClient for MemoryClient {
    fn send(&self, data: Bytes, options: &SendOptions) -> Result<(), ClientError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ClientError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted send failure",
            )));
        }
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((data.clone(), *options));

        let responder = self
            .responder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(responder) = responder {
            for chunk in responder(&data) {
                self.inject(chunk);
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool { self.connected.load(Ordering::SeqCst) }

    fn disconnected(&self) -> &Listeners<DisconnectEvent> { &self.disconnected }

    fn data_received(&self) -> &Listeners<DataReceived> { &self.data_received }
}
