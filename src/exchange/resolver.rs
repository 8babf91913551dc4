//! Single-resolution completion slot shared by an exchange's listeners.

use std::sync::{
    Arc,
    Mutex,
    PoisonError,
    mpsc::{self, Receiver, SyncSender},
};

use tokio::sync::oneshot;

use crate::{
    client::BytesClient,
    correlation::ReplyMatcher,
    disconnect::{DisconnectEvent, DisconnectionReasonCode},
    listeners::{Listeners, Subscription},
};

/// What completed the wait.
#[derive(Debug)]
pub(crate) enum Signal<F> {
    Frame(F),
    Disconnected(DisconnectionReasonCode),
}

enum Waker<F> {
    Blocking(SyncSender<Signal<F>>),
    Async(oneshot::Sender<Signal<F>>),
}

/// Slot resolved by whichever listener fires first.
///
/// Once resolved or closed every further `resolve` is a no-op.
pub(crate) struct Resolver<F> {
    waker: Mutex<Option<Waker<F>>>,
}

impl<F> Resolver<F> {
    /// Resolver woken through a blocking channel.
    pub(crate) fn blocking() -> (Arc<Self>, Receiver<Signal<F>>) {
        let (tx, rx) = mpsc::sync_channel(1);
        (Self::with(Waker::Blocking(tx)), rx)
    }

    /// Resolver woken through a oneshot future.
    pub(crate) fn pending() -> (Arc<Self>, oneshot::Receiver<Signal<F>>) {
        let (tx, rx) = oneshot::channel();
        (Self::with(Waker::Async(tx)), rx)
    }

    fn with(waker: Waker<F>) -> Arc<Self> {
        Arc::new(Self {
            waker: Mutex::new(Some(waker)),
        })
    }

    /// Deliver `signal` if nothing has been delivered yet.
    ///
    /// Returns `true` when this call resolved the slot.
    pub(crate) fn resolve(&self, signal: Signal<F>) -> bool {
        let waker = self
            .waker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match waker {
            // The receiver may already be gone if the waiter gave up; the
            // slot counts as resolved either way.
            Some(Waker::Blocking(tx)) => {
                let _ = tx.try_send(signal);
                true
            }
            Some(Waker::Async(tx)) => {
                let _ = tx.send(signal);
                true
            }
            None => false,
        }
    }

    /// Whether the slot no longer accepts signals.
    pub(crate) fn is_resolved(&self) -> bool {
        self.waker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Refuse any further signal.
    pub(crate) fn close(&self) {
        self.waker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Listener registrations owned by one exchange.
///
/// Dropping this value deregisters both listeners.
pub(crate) struct Armed {
    _frames: Subscription,
    _disconnects: Subscription,
}

/// Register the frame and disconnect listeners feeding `resolver`.
pub(crate) fn arm<R, F, M>(
    frames: &Listeners<F>,
    client: &dyn BytesClient,
    request: &Arc<R>,
    matcher: M,
    resolver: &Arc<Resolver<F>>,
) -> Armed
where
    R: Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
    M: ReplyMatcher<R, F>,
{
    let on_frame = {
        let request = Arc::clone(request);
        let resolver = Arc::clone(resolver);
        frames.subscribe(move |frame: &F| {
            if resolver.is_resolved() || !matcher.matches(request.as_ref(), frame) {
                return;
            }
            if resolver.resolve(Signal::Frame(frame.clone())) {
                tracing::trace!("matching frame captured");
            }
        })
    };
    let on_disconnect = {
        let resolver = Arc::clone(resolver);
        client
            .disconnected()
            .subscribe(move |event: &DisconnectEvent| {
                resolver.resolve(Signal::Disconnected(event.reason_code()));
            })
    };
    Armed {
        _frames: on_frame,
        _disconnects: on_disconnect,
    }
}
