//! Disconnection events and their cause.

use std::{error::Error, fmt, sync::Arc};

/// Why a connection ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisconnectionReasonCode {
    /// Closed locally, for example by an explicit `close` call.
    #[default]
    Active,
    /// Closed by the remote peer.
    Passive,
    /// Torn down because of a transport fault.
    Error,
    /// Closed by a local liveness timer.
    Timeout,
}

impl DisconnectionReasonCode {
    /// Every reason code, in declaration order.
    pub const ALL: [Self; 4] = [Self::Active, Self::Passive, Self::Error, Self::Timeout];

    /// Whether this side of the link ended the connection.
    ///
    /// Local timeouts count as active: the remote peer did not sever the
    /// link.
    #[must_use]
    pub const fn is_actively(self) -> bool { matches!(self, Self::Active | Self::Timeout) }

    /// Stable lower-case name used for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Passive => "passive",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for DisconnectionReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Shared fault attached to a disconnection.
pub type DisconnectCause = Arc<dyn Error + Send + Sync>;

/// Notification broadcast once per disconnection.
///
/// # Examples
///
/// ```
/// use bytesio::disconnect::{DisconnectEvent, DisconnectionReasonCode};
///
/// let event = DisconnectEvent::new(DisconnectionReasonCode::Passive);
/// assert!(!event.is_actively());
/// assert!(DisconnectEvent::default().is_actively());
/// ```
#[derive(Clone, Debug, Default)]
pub struct DisconnectEvent {
    reason_code: DisconnectionReasonCode,
    error: Option<DisconnectCause>,
}

impl DisconnectEvent {
    /// Create an event without an attached fault.
    #[must_use]
    pub fn new(reason_code: DisconnectionReasonCode) -> Self {
        Self {
            reason_code,
            error: None,
        }
    }

    /// Create an event carrying the fault that caused it.
    #[must_use]
    pub fn with_error<E>(reason_code: DisconnectionReasonCode, error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            reason_code,
            error: Some(Arc::new(error)),
        }
    }

    /// Event for a transport read or write failure.
    #[must_use]
    pub fn from_io_error(error: std::io::Error) -> Self {
        Self::with_error(DisconnectionReasonCode::Error, error)
    }

    /// Reason the connection ended.
    #[must_use]
    pub fn reason_code(&self) -> DisconnectionReasonCode { self.reason_code }

    /// Fault attached to the disconnection, if any.
    #[must_use]
    pub fn error(&self) -> Option<&DisconnectCause> { self.error.as_ref() }

    /// Whether this side of the link ended the connection.
    #[must_use]
    pub fn is_actively(&self) -> bool { self.reason_code.is_actively() }
}

impl fmt::Display for DisconnectEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "{} disconnect: {error}", self.reason_code),
            None => write!(f, "{} disconnect", self.reason_code),
        }
    }
}
