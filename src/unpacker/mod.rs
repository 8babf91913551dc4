//! Push-based frame reassembly.
//!
//! An [`Unpacker`] accepts raw chunks in arbitrary sizes, keeps incomplete
//! frames across calls and broadcasts one notification per decoded frame.
//! Malformed input is reported on a separate error channel and never
//! poisons the reassembly state for the frames that follow.
//!
//! Binding an unpacker to a [`BytesClient`] routes the client's
//! data-received notifications into [`Unpacker::input`]; the binding is also
//! what the exchange engine uses to find the transport to send on.

use std::{
    collections::VecDeque,
    fmt,
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use bytes::BytesMut;
use tokio_util::codec::Decoder;

mod config;
mod error;

pub use config::{DEFAULT_INITIAL_CAPACITY, UnpackerConfig};
pub use error::UnpackError;

use crate::{
    client::{BytesClient, DataReceived},
    codec::FrameCodec,
    listeners::{Listeners, Subscription},
    metrics,
};

enum Unpacked<F> {
    Frame(F),
    Failed(UnpackError),
}

struct Reassembly<D, F> {
    buffer: BytesMut,
    decoder: D,
    /// Results waiting to be broadcast, oldest first.
    pending: VecDeque<Unpacked<F>>,
    /// Set while some caller is draining `pending`.
    emitting: bool,
}

impl<D, F> Reassembly<D, F> {
    fn discard(&mut self, decoder: D) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        self.decoder = decoder;
        dropped
    }
}

/// Clears the emitting flag even if a listener panics.
struct EmitGuard<'a, D, F> {
    state: &'a Mutex<Reassembly<D, F>>,
}

impl<D, F> Drop for EmitGuard<'_, D, F> {
    fn drop(&mut self) { lock(self.state).emitting = false; }
}

struct Binding {
    client: Arc<dyn BytesClient>,
    _feed: Subscription,
}

/// Stateful demultiplexer turning byte chunks into frames.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use bytes::BytesMut;
/// use bytesio::{codec::FnCodec, unpacker::Unpacker};
/// use tokio_util::codec::{Decoder, LinesCodec};
///
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
/// let unpacker = Unpacker::new(FnCodec::new(|| Lines(LinesCodec::new())));
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let _subscription = unpacker.frames().subscribe(move |line: &String| {
///     sink.lock().expect("lock").push(line.clone());
/// });
///
/// unpacker.input(b"PI");
/// unpacker.input(b"NG\nPO");
/// unpacker.input(b"NG\n");
/// assert_eq!(*seen.lock().expect("lock"), ["PING", "PONG"]);
/// ```
pub struct Unpacker<K: FrameCodec> {
    codec: K,
    config: UnpackerConfig,
    state: Mutex<Reassembly<K::Decoder, K::Frame>>,
    frames: Listeners<K::Frame>,
    errors: Listeners<UnpackError>,
    binding: Mutex<Option<Binding>>,
}

impl<K: FrameCodec> fmt::Debug for Unpacker<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unpacker")
            .field("config", &self.config)
            .field("buffered", &self.buffered())
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Guarded state is never left half-updated across a panic point.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K: FrameCodec> Unpacker<K> {
    /// Create an unbound unpacker with default settings.
    #[must_use]
    pub fn new(codec: K) -> Arc<Self> { Self::with_config(codec, UnpackerConfig::default()) }

    /// Create an unbound unpacker with explicit settings.
    #[must_use]
    pub fn with_config(codec: K, config: UnpackerConfig) -> Arc<Self> {
        let decoder = codec.decoder();
        Arc::new(Self {
            codec,
            config,
            state: Mutex::new(Reassembly {
                buffer: BytesMut::with_capacity(config.initial_capacity_value()),
                decoder,
                pending: VecDeque::new(),
                emitting: false,
            }),
            frames: Listeners::new(),
            errors: Listeners::new(),
            binding: Mutex::new(None),
        })
    }

    /// Feed raw bytes into the reassembly buffer.
    ///
    /// Frames completed by these bytes are broadcast on
    /// [`frames`](Self::frames) in the order they complete, and a decode
    /// failure is broadcast on [`errors`](Self::errors) after the frames
    /// decoded ahead of it. Results of earlier calls are always broadcast
    /// first.
    ///
    /// Notifications are emitted without holding the reassembly lock, so
    /// listeners may feed this unpacker again. Such nested calls, and calls
    /// racing in from other threads while a broadcast is running, only queue
    /// their results; the caller already broadcasting delivers them once the
    /// current results are out.
    pub fn input(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        {
            let mut state = lock(&self.state);
            self.reassemble(&mut state, data);
            if state.emitting {
                return;
            }
            state.emitting = true;
        }

        let _guard = EmitGuard { state: &self.state };
        loop {
            let next = lock(&self.state).pending.pop_front();
            match next {
                Some(Unpacked::Frame(frame)) => {
                    metrics::inc_frames_unpacked();
                    self.frames.emit(&frame);
                }
                Some(Unpacked::Failed(error)) => {
                    tracing::warn!(
                        error = %error,
                        discarded = error.discarded(),
                        "dropping malformed input"
                    );
                    metrics::inc_unpack_errors();
                    self.errors.emit(&error);
                }
                None => break,
            }
        }
    }

    fn reassemble(&self, state: &mut Reassembly<K::Decoder, K::Frame>, data: &[u8]) {
        state.buffer.extend_from_slice(data);

        let mut frames = 0_usize;
        loop {
            match state.decoder.decode(&mut state.buffer) {
                Ok(Some(frame)) => {
                    state.pending.push_back(Unpacked::Frame(frame));
                    frames += 1;
                }
                Ok(None) => break,
                Err(source) => {
                    let discarded = state.discard(self.codec.decoder());
                    state
                        .pending
                        .push_back(Unpacked::Failed(UnpackError::Decode { source, discarded }));
                    return;
                }
            }
        }

        if let Some(max) = self.config.max_buffered_value() {
            let buffered = state.buffer.len();
            if buffered > max {
                state.discard(self.codec.decoder());
                state
                    .pending
                    .push_back(Unpacked::Failed(UnpackError::BufferOverflow { buffered, max }));
                return;
            }
        }
        tracing::trace!(frames, buffered = state.buffer.len(), "reassembled input");
    }

    /// Registry notified once per decoded frame.
    #[must_use]
    pub fn frames(&self) -> &Listeners<K::Frame> { &self.frames }

    /// Registry notified for every malformed-input failure.
    #[must_use]
    pub fn errors(&self) -> &Listeners<UnpackError> { &self.errors }

    /// Bytes currently held while waiting for a frame to complete.
    #[must_use]
    pub fn buffered(&self) -> usize { lock(&self.state).buffer.len() }

    /// Drop any partial frame and restart the decoder.
    pub fn reset(&self) {
        let dropped = lock(&self.state).discard(self.codec.decoder());
        if dropped > 0 {
            tracing::debug!(dropped, "reassembly state reset");
        }
    }

    /// Codec driving this unpacker.
    #[must_use]
    pub fn codec(&self) -> &K { &self.codec }

    /// Feed the data received by `client` into this unpacker.
    ///
    /// An unpacker serves one client at a time: binding replaces any previous
    /// binding and discards partial frames left over from it. Concrete
    /// clients coerce to `Arc<dyn BytesClient>` at the call site.
    pub fn bind(self: &Arc<Self>, client: Arc<dyn BytesClient>) {
        self.reset();
        let unpacker: Weak<Self> = Arc::downgrade(self);
        let feed = client.data_received().subscribe(move |event: &DataReceived| {
            if let Some(unpacker) = unpacker.upgrade() {
                unpacker.input(event.data());
            }
        });

        let previous = mem::replace(
            &mut *lock(&self.binding),
            Some(Binding {
                client,
                _feed: feed,
            }),
        );
        if previous.is_some() {
            tracing::debug!("unpacker rebound to a new client");
        }
        drop(previous);
    }

    /// Stop consuming the bound client's data.
    ///
    /// Returns the client that was bound, if any.
    pub fn unbind(&self) -> Option<Arc<dyn BytesClient>> {
        let previous = lock(&self.binding).take();
        previous.map(|binding| binding.client)
    }

    /// Client currently feeding this unpacker.
    #[must_use]
    pub fn client(&self) -> Option<Arc<dyn BytesClient>> {
        lock(&self.binding)
            .as_ref()
            .map(|binding| Arc::clone(&binding.client))
    }

    /// Whether a client is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool { lock(&self.binding).is_some() }
}
