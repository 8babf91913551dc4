//! Reply matching for correlated exchanges.
//!
//! A single stream often multiplexes replies with unrelated traffic such as
//! heartbeats, status pushes or replies to other requests. A
//! [`ReplyMatcher`] decides which inbound frame answers a given request.
//! Typical strategies compare a command byte, a transaction number or a
//! correlation identifier, or skip high-frequency pushes and take the next
//! frame after them.

/// Decide whether `frame` answers `request`.
///
/// Any `Fn(&R, &F) -> bool` closure is a matcher.
///
/// # Examples
///
/// ```
/// use bytesio::correlation::ReplyMatcher;
///
/// let same_command = |request: &Vec<u8>, frame: &Vec<u8>| request.first() == frame.first();
/// assert!(same_command.matches(&vec![0x10, 1], &vec![0x10, 9]));
/// assert!(!same_command.matches(&vec![0x10], &vec![0x20]));
/// ```
pub trait ReplyMatcher<R, F>: Send + Sync + 'static {
    /// Return `true` if `frame` is the reply to `request`.
    fn matches(&self, request: &R, frame: &F) -> bool;
}

impl<R, F, T> ReplyMatcher<R, F> for T
where
    T: Fn(&R, &F) -> bool + Send + Sync + 'static,
{
    fn matches(&self, request: &R, frame: &F) -> bool { self(request, frame) }
}

/// Matcher accepting the first frame produced after the request is sent.
#[derive(Clone, Copy, Debug, Default)]
pub struct MatchAny;

/// Read correlation identifiers from frames.
pub trait CorrelatableFrame {
    /// Return the correlation identifier associated with this frame, if any.
    fn correlation_id(&self) -> Option<u64>;
}

/// Matcher pairing frames whose correlation identifier equals the request's.
///
/// Requests without an identifier never match.
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrelationIdMatcher;

impl<R, F> ReplyMatcher<R, F> for MatchAny {
    fn matches(&self, _request: &R, _frame: &F) -> bool { true }
}

impl<R, F> ReplyMatcher<R, F> for CorrelationIdMatcher
where
    R: CorrelatableFrame,
    F: CorrelatableFrame,
{
    fn matches(&self, request: &R, frame: &F) -> bool {
        request
            .correlation_id()
            .is_some_and(|id| frame.correlation_id() == Some(id))
    }
}
