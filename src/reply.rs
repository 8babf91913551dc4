//! Outcome of a single correlated send.
//!
//! A [`Reply`] is created once by the exchange engine, read by the caller
//! and discarded. The outcome is stored as a closed enum, so a value is only
//! ever present for [`ReplyStatus::Completed`] and an error only for
//! [`ReplyStatus::Error`].

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{
    client::{BytesClient, ClientError},
    request::BoxError,
};

/// Status of a correlated send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplyStatus {
    /// A matching frame arrived before the deadline.
    Completed,
    /// No matching frame arrived before the deadline.
    Timeout,
    /// A local fault prevented the exchange.
    Error,
    /// The connection dropped while waiting.
    Interrupted,
}

impl ReplyStatus {
    /// Stable lower-case name used for logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Timeout => "timeout",
            Self::Error => "error",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Local faults surfaced through [`ReplyStatus::Error`].
#[derive(Debug, Error)]
pub enum ReplyError {
    /// The request could not be turned into bytes.
    #[error("failed to serialize request")]
    Serialize(#[source] BoxError),
    /// The transport rejected the outbound bytes.
    #[error("failed to send request")]
    Send(#[source] ClientError),
}

#[derive(Debug)]
enum Outcome<F> {
    Completed(F),
    Timeout,
    Error(ReplyError),
    Interrupted,
}

/// Resolved outcome of one send-and-wait call.
pub struct Reply<F> {
    client: Arc<dyn BytesClient>,
    outcome: Outcome<F>,
}

impl<F> Reply<F> {
    /// Successful reply carrying the matched frame.
    #[must_use]
    pub fn completed(client: Arc<dyn BytesClient>, value: F) -> Self {
        Self {
            client,
            outcome: Outcome::Completed(value),
        }
    }

    /// Reply for an exchange whose deadline expired.
    #[must_use]
    pub fn timeout(client: Arc<dyn BytesClient>) -> Self {
        Self {
            client,
            outcome: Outcome::Timeout,
        }
    }

    /// Reply for an exchange interrupted by a disconnect.
    #[must_use]
    pub fn interrupted(client: Arc<dyn BytesClient>) -> Self {
        Self {
            client,
            outcome: Outcome::Interrupted,
        }
    }

    /// Reply for an exchange that failed locally.
    #[must_use]
    pub fn failed(client: Arc<dyn BytesClient>, error: ReplyError) -> Self {
        Self {
            client,
            outcome: Outcome::Error(error),
        }
    }

    /// Status of the exchange.
    #[must_use]
    pub fn status(&self) -> ReplyStatus {
        match self.outcome {
            Outcome::Completed(_) => ReplyStatus::Completed,
            Outcome::Timeout => ReplyStatus::Timeout,
            Outcome::Error(_) => ReplyStatus::Error,
            Outcome::Interrupted => ReplyStatus::Interrupted,
        }
    }

    /// Whether a matching frame was received.
    #[must_use]
    pub fn is_completed(&self) -> bool { matches!(self.outcome, Outcome::Completed(_)) }

    /// Client that produced this outcome.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn BytesClient> { &self.client }

    /// Matched frame, present only for [`ReplyStatus::Completed`].
    #[must_use]
    pub fn value(&self) -> Option<&F> {
        match &self.outcome {
            Outcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// Local fault, present only for [`ReplyStatus::Error`].
    #[must_use]
    pub fn error(&self) -> Option<&ReplyError> {
        match &self.outcome {
            Outcome::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Consume the reply, returning the matched frame if any.
    #[must_use]
    pub fn into_value(self) -> Option<F> {
        match self.outcome {
            Outcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

impl<F: fmt::Debug> fmt::Debug for Reply<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("status", &self.status())
            .field("value", &self.value())
            .field("error", &self.error())
            .finish_non_exhaustive()
    }
}
