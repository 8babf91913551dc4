//! Reply correlation engine.
//!
//! An exchange sends one request and waits for the first inbound frame a
//! [`ReplyMatcher`] accepts, for a disconnect, or for its deadline, whichever
//! comes first. Both listeners are registered before the request is written
//! and are deregistered on every exit path, including when an asynchronous
//! wait is dropped mid-flight.
//!
//! ```
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use bytesio::{
//!     exchange::Exchange,
//!     test_helpers::{MemoryClient, TagCodec, TagFrame, encode_all},
//!     unpacker::Unpacker,
//! };
//!
//! let client = MemoryClient::shared();
//! client.respond_with(|_| vec![encode_all(&[TagFrame::tag("STATUS"), TagFrame::tag("PONG")])]);
//! let unpacker = Unpacker::new(TagCodec::default());
//! unpacker.bind(client);
//!
//! let reply = Exchange::new(TagFrame::tag("PING"), Duration::from_millis(500))
//!     .matching(|_: &TagFrame, frame: &TagFrame| frame.tag == "PONG")
//!     .wait(&unpacker)
//!     .expect("unpacker is bound");
//! assert_eq!(reply.value().map(|frame| frame.tag.as_str()), Some("PONG"));
//! ```

use std::{
    sync::{Arc, mpsc::RecvTimeoutError},
    time::Duration,
};

use crate::{
    client::{BytesClient, DataReceived, SendOptions},
    codec::FrameCodec,
    correlation::{MatchAny, ReplyMatcher},
    listeners::Listeners,
    metrics,
    reply::{Reply, ReplyError},
    request::Request,
    unpacker::Unpacker,
};

mod error;
mod resolver;

pub use error::ArgumentError;
use resolver::{Armed, Resolver, Signal, arm};

/// Builder for one correlated send.
///
/// Without [`matching`](Self::matching) the first frame produced after the
/// send is accepted.
#[derive(Debug)]
pub struct Exchange<R, M = MatchAny> {
    request: R,
    timeout: Duration,
    matcher: M,
    options: SendOptions,
}

impl<R: Request> Exchange<R> {
    /// Start an exchange for `request` that gives up after `timeout`.
    #[must_use]
    pub fn new(request: R, timeout: Duration) -> Self {
        Self {
            request,
            timeout,
            matcher: MatchAny,
            options: SendOptions::default(),
        }
    }
}

impl<R: Request, M> Exchange<R, M> {
    /// Accept only frames for which `matcher` returns `true`.
    #[must_use]
    pub fn matching<N>(self, matcher: N) -> Exchange<R, N> {
        Exchange {
            request: self.request,
            timeout: self.timeout,
            matcher,
            options: self.options,
        }
    }

    /// Transport hints passed to [`BytesClient::send`].
    #[must_use]
    pub fn send_options(mut self, options: SendOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the deadline. It starts counting once the request is sent.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send the request and block the current thread until it resolves.
    ///
    /// Frames are taken from `unpacker`; the request is written to the client
    /// the unpacker is bound to. Do not call this from an async task; use
    /// [`wait_async`](Self::wait_async) there.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::Unbound`] without sending anything if the
    /// unpacker has no client.
    pub fn wait<K>(self, unpacker: &Unpacker<K>) -> Result<Reply<K::Frame>, ArgumentError>
    where
        K: FrameCodec,
        M: ReplyMatcher<R, K::Frame>,
    {
        let client = unpacker.client().ok_or(ArgumentError::Unbound)?;
        Ok(self.run_blocking(client, unpacker.frames()))
    }

    /// Send the request and wait for it to resolve without blocking the
    /// executor.
    ///
    /// Dropping the returned future abandons the exchange and deregisters its
    /// listeners.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::Unbound`] without sending anything if the
    /// unpacker has no client.
    pub async fn wait_async<K>(
        self,
        unpacker: &Unpacker<K>,
    ) -> Result<Reply<K::Frame>, ArgumentError>
    where
        K: FrameCodec,
        M: ReplyMatcher<R, K::Frame>,
    {
        let client = unpacker.client().ok_or(ArgumentError::Unbound)?;
        Ok(self.run_async(client, unpacker.frames()).await)
    }

    /// Blocking exchange matched against raw chunks read by `client`.
    pub fn wait_raw(self, client: Arc<dyn BytesClient>) -> Reply<DataReceived>
    where
        M: ReplyMatcher<R, DataReceived>,
    {
        let source = Arc::clone(&client);
        self.run_blocking(client, source.data_received())
    }

    /// Asynchronous exchange matched against raw chunks read by `client`.
    pub async fn wait_raw_async(self, client: Arc<dyn BytesClient>) -> Reply<DataReceived>
    where
        M: ReplyMatcher<R, DataReceived>,
    {
        let source = Arc::clone(&client);
        self.run_async(client, source.data_received()).await
    }

    fn run_blocking<F>(self, client: Arc<dyn BytesClient>, frames: &Listeners<F>) -> Reply<F>
    where
        F: Clone + Send + Sync + 'static,
        M: ReplyMatcher<R, F>,
    {
        let timeout = self.timeout;
        let (resolver, rx) = Resolver::blocking();
        let armed = match self.start(client.as_ref(), frames, &resolver) {
            Ok(armed) => armed,
            Err(error) => return fail(client, error),
        };

        let signal = match rx.recv_timeout(timeout) {
            Ok(signal) => Some(signal),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        };
        resolver.close();
        drop(armed);
        settle(client, signal, timeout)
    }

    async fn run_async<F>(self, client: Arc<dyn BytesClient>, frames: &Listeners<F>) -> Reply<F>
    where
        F: Clone + Send + Sync + 'static,
        M: ReplyMatcher<R, F>,
    {
        let timeout = self.timeout;
        let (resolver, rx) = Resolver::pending();
        let armed = match self.start(client.as_ref(), frames, &resolver) {
            Ok(armed) => armed,
            Err(error) => return fail(client, error),
        };

        let signal = tokio::time::timeout(timeout, rx).await.ok().and_then(Result::ok);
        resolver.close();
        drop(armed);
        settle(client, signal, timeout)
    }

    /// Serialize, register both listeners, then send.
    fn start<F>(
        self,
        client: &dyn BytesClient,
        frames: &Listeners<F>,
        resolver: &Arc<Resolver<F>>,
    ) -> Result<Armed, ReplyError>
    where
        F: Clone + Send + Sync + 'static,
        M: ReplyMatcher<R, F>,
    {
        let bytes = self.request.to_bytes().map_err(ReplyError::Serialize)?;
        let len = bytes.len();
        let request = Arc::new(self.request);
        let armed = arm(frames, client, &request, self.matcher, resolver);

        client
            .send(bytes, &self.options)
            .map_err(ReplyError::Send)?;
        tracing::debug!(
            bytes = len,
            timeout_ms = millis(self.timeout),
            "request sent, awaiting reply"
        );
        Ok(armed)
    }
}

/// Send `request` through the client bound to `unpacker` and block until a
/// frame accepted by `matcher` arrives, the client disconnects or `timeout`
/// elapses.
///
/// # Errors
///
/// Returns [`ArgumentError::Unbound`] if the unpacker has no client.
pub fn send_and_wait<K, R, M>(
    unpacker: &Unpacker<K>,
    request: R,
    timeout: Duration,
    matcher: M,
) -> Result<Reply<K::Frame>, ArgumentError>
where
    K: FrameCodec,
    R: Request,
    M: ReplyMatcher<R, K::Frame>,
{
    Exchange::new(request, timeout)
        .matching(matcher)
        .wait(unpacker)
}

/// Asynchronous form of [`send_and_wait`].
///
/// # Errors
///
/// Returns [`ArgumentError::Unbound`] if the unpacker has no client.
pub async fn send_and_wait_async<K, R, M>(
    unpacker: &Unpacker<K>,
    request: R,
    timeout: Duration,
    matcher: M,
) -> Result<Reply<K::Frame>, ArgumentError>
where
    K: FrameCodec,
    R: Request,
    M: ReplyMatcher<R, K::Frame>,
{
    Exchange::new(request, timeout)
        .matching(matcher)
        .wait_async(unpacker)
        .await
}

fn fail<F>(client: Arc<dyn BytesClient>, error: ReplyError) -> Reply<F> {
    tracing::debug!(error = %error, "exchange failed before waiting");
    let reply = Reply::failed(client, error);
    metrics::inc_replies(reply.status());
    reply
}

fn settle<F>(
    client: Arc<dyn BytesClient>,
    signal: Option<Signal<F>>,
    timeout: Duration,
) -> Reply<F> {
    let reply = match signal {
        Some(Signal::Frame(frame)) => {
            tracing::debug!("reply matched");
            Reply::completed(client, frame)
        }
        Some(Signal::Disconnected(reason)) => {
            metrics::inc_interruptions(reason);
            if client.is_connected() {
                tracing::debug!(
                    reason = %reason,
                    "disconnect interrupted exchange but client reports connected"
                );
            } else {
                tracing::debug!(reason = %reason, "exchange interrupted by disconnect");
            }
            Reply::interrupted(client)
        }
        None => {
            tracing::debug!(timeout_ms = millis(timeout), "exchange timed out");
            Reply::timeout(client)
        }
    };
    metrics::inc_replies(reply.status());
    reply
}

fn millis(duration: Duration) -> u64 { u64::try_from(duration.as_millis()).unwrap_or(u64::MAX) }

#[cfg(test)]
mod tests;
