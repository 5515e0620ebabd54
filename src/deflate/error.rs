//! Errors for permessage-deflate negotiation and streaming.

use thiserror::Error;

/// Extension parameters that cannot be reconciled with local options.
///
/// Negotiation runs during the opening handshake, so these errors fail
/// connection setup rather than a message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NegotiationError {
    /// The same parameter appeared more than once in one offer.
    #[error("multiple extension parameters for {key}")]
    DuplicateParameter { key: String },

    /// A parameter carried a value it does not accept.
    #[error("invalid extension parameter value for {key} ({value})")]
    InvalidValue { key: String, value: String },

    /// A window-bits parameter was sent bare where a value is required.
    #[error("missing extension parameter value for {key}")]
    MissingValue { key: String },

    /// The parameter is not defined for permessage-deflate.
    #[error("not defined extension parameter ({key})")]
    UnknownParameter { key: String },

    /// Window bits outside 8..=15.
    #[error("window bits {bits} outside 8..=15")]
    WindowBitsOutOfRange { bits: u8 },

    /// None of the peer's offers is compatible with local options.
    #[error("doesn't support the offered configuration")]
    NoAcceptableOffer,

    /// The peer's response must contain exactly one parameter set.
    #[error("expected exactly one accepted parameter set, got {count}")]
    UnexpectedResponseCount { count: usize },

    /// The peer accepted a value local options forbid.
    #[error("invalid value for \"{key}\" in accepted parameters")]
    RejectedResponse { key: &'static str },
}

/// Failures of the streaming deflate codec.
#[derive(Debug, Error)]
pub enum DeflateError {
    /// The deflate stream rejected its input.
    #[error("deflate failed: {0}")]
    Compress(#[from] flate2::CompressError),

    /// The inflate stream found malformed compressed data.
    #[error("inflate failed: {0}")]
    Decompress(#[from] flate2::DecompressError),

    /// The blocking task running the codec did not complete.
    #[error("codec task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
