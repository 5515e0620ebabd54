//! Metric helpers for `wsframe`.
//!
//! This module defines metric names and simple helper functions wrapping
//! the [`metrics`](https://docs.rs/metrics) crate. With the `metrics`
//! feature disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking decoded and encoded frames.
pub const FRAMES_TOTAL: &str = "wsframe_frames_total";
/// Name of the counter tracking protocol violations by close code.
pub const PROTOCOL_ERRORS_TOTAL: &str = "wsframe_protocol_errors_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Frames decoded from the peer.
    Inbound,
    /// Frames encoded for the peer.
    Outbound,
}

impl Direction {
    /// Label value used for this direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a protocol violation that fails the connection with `code`.
pub fn inc_protocol_errors(code: u16) {
    #[cfg(feature = "metrics")]
    counter!(PROTOCOL_ERRORS_TOTAL, "code" => code.to_string()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = code;
}
