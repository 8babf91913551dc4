//! Per-send options passed to transports.

use std::net::SocketAddr;

/// Hints accompanying a single [`BytesClient::send`](super::BytesClient::send).
///
/// Transports ignore hints they cannot honour.
///
/// # Examples
///
/// ```
/// use bytesio::client::SendOptions;
///
/// let options = SendOptions::default().flush(false);
/// assert!(!options.flush_value());
/// assert_eq!(options.target_value(), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendOptions {
    flush: bool,
    target: Option<SocketAddr>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            flush: true,
            target: None,
        }
    }
}

impl SendOptions {
    /// Request an immediate flush of buffered writes. Enabled by default.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytesio::client::SendOptions;
    ///
    /// let options = SendOptions::default().flush(false);
    /// let expected = SendOptions::default().flush(false);
    /// assert_eq!(options, expected);
    /// ```
    #[must_use]
    pub fn flush(mut self, enabled: bool) -> Self {
        self.flush = enabled;
        self
    }

    /// Address a datagram to `target` instead of the default peer.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::net::SocketAddr;
    ///
    /// use bytesio::client::SendOptions;
    ///
    /// let addr: SocketAddr = "127.0.0.1:9000".parse().expect("valid socket address");
    /// let options = SendOptions::default().target(addr);
    /// assert_eq!(options.target_value(), Some(addr));
    /// ```
    #[must_use]
    pub fn target(mut self, addr: SocketAddr) -> Self {
        self.target = Some(addr);
        self
    }

    /// Whether the transport should flush after writing.
    #[must_use]
    pub fn flush_value(&self) -> bool { self.flush }

    /// Explicit datagram destination, if any.
    #[must_use]
    pub fn target_value(&self) -> Option<SocketAddr> { self.target }
}
