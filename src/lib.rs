//! Public API for the `bytesio` library.
//!
//! This crate turns an event-driven byte stream into correlated
//! request/response exchanges. It provides a push-based frame
//! [`Unpacker`], a reply correlation engine ([`Exchange`],
//! [`send_and_wait`]) and the result model ([`Reply`], [`ReplyStatus`],
//! [`DisconnectionReasonCode`]) callers use to tell success, timeouts,
//! interruptions and local faults apart.
//!
//! Concrete transports stay outside the crate: they implement
//! [`BytesClient`] and report inbound chunks and disconnects through its
//! listener registries.

pub mod client;
pub mod codec;
pub mod correlation;
pub mod disconnect;
pub mod exchange;
pub mod listeners;
pub mod metrics;
pub mod reply;
pub mod request;
pub mod unpacker;

#[cfg(any(test, feature = "test-helpers"))]
#[doc(hidden)]
pub mod test_helpers;

pub use client::{BytesClient, ClientError, DataReceived, SendOptions};
pub use codec::{FnCodec, FrameCodec};
pub use correlation::{CorrelatableFrame, CorrelationIdMatcher, MatchAny, ReplyMatcher};
pub use disconnect::{DisconnectCause, DisconnectEvent, DisconnectionReasonCode};
pub use exchange::{ArgumentError, Exchange, send_and_wait, send_and_wait_async};
pub use listeners::{ListenerId, Listeners, Subscription};
pub use metrics::{EXCHANGES_INTERRUPTED, FRAMES_UNPACKED, REPLIES_TOTAL, UNPACK_ERRORS_TOTAL};
pub use reply::{Reply, ReplyError, ReplyStatus};
pub use request::{Bincode, BoxError, Request};
pub use unpacker::{UnpackError, Unpacker, UnpackerConfig};
