//! Metric helpers for `bytesio`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

use crate::{disconnect::DisconnectionReasonCode, reply::ReplyStatus};

/// Name of the counter tracking resolved exchanges, labelled by `status`.
pub const REPLIES_TOTAL: &str = "bytesio_replies_total";
/// Name of the counter tracking frames produced by unpackers.
pub const FRAMES_UNPACKED: &str = "bytesio_frames_unpacked_total";
/// Name of the counter tracking malformed-input reports.
pub const UNPACK_ERRORS_TOTAL: &str = "bytesio_unpack_errors_total";
/// Name of the counter tracking exchanges cut short by a disconnect,
/// labelled by `reason`.
///
/// One disconnect interrupting several pending exchanges adds one per
/// exchange.
pub const EXCHANGES_INTERRUPTED: &str = "bytesio_exchanges_interrupted_total";

/// Record a resolved exchange.
#[cfg(feature = "metrics")]
pub fn inc_replies(status: ReplyStatus) {
    metrics::counter!(REPLIES_TOTAL, "status" => status.as_str()).increment(1);
}

/// Record a frame produced by an unpacker.
#[cfg(feature = "metrics")]
pub fn inc_frames_unpacked() { metrics::counter!(FRAMES_UNPACKED).increment(1); }

/// Record malformed input reported by an unpacker.
#[cfg(feature = "metrics")]
pub fn inc_unpack_errors() { metrics::counter!(UNPACK_ERRORS_TOTAL).increment(1); }

/// Record an exchange interrupted by a disconnect.
#[cfg(feature = "metrics")]
pub fn inc_interruptions(reason: DisconnectionReasonCode) {
    metrics::counter!(EXCHANGES_INTERRUPTED, "reason" => reason.as_str()).increment(1);
}

/// Record a resolved exchange.
#[cfg(not(feature = "metrics"))]
pub fn inc_replies(_status: ReplyStatus) {}

/// Record a frame produced by an unpacker.
#[cfg(not(feature = "metrics"))]
pub fn inc_frames_unpacked() {}

/// Record malformed input reported by an unpacker.
#[cfg(not(feature = "metrics"))]
pub fn inc_unpack_errors() {}

/// Record an exchange interrupted by a disconnect.
#[cfg(not(feature = "metrics"))]
pub fn inc_interruptions(_reason: DisconnectionReasonCode) {}
