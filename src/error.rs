//! Error types shared across the frame engine.
//!
//! The taxonomy follows the failure classes a WebSocket endpoint has to
//! distinguish when deciding how to close a connection:
//!
//! - [`ProtocolError`]: malformed or illegal frames. Always fatal to the logical message stream
//!   and mapped to a close status code via [`ProtocolError::close_code`].
//! - [`DeflateError`](crate::deflate::DeflateError): compression failures. Reported to peers as
//!   close code 1007 when they occur on the inbound path.
//! - [`NegotiationError`](crate::deflate::NegotiationError): incompatible extension parameters.
//!   These fail connection setup and never reach the frame engine.
//! - [`WsError`]: top-level enum wrapping all categories plus transport I/O errors.

use std::io;

use thiserror::Error;

use crate::{
    arena::ArenaError,
    close,
    deflate::{DeflateError, NegotiationError},
};

/// Violations detected while decoding inbound frames.
///
/// Every variant carries the close code the connection should be closed with.
///
/// # Examples
///
/// ```
/// use wsframe::error::ProtocolError;
///
/// let err = ProtocolError::ControlFrameTooLong { marker: 126 };
/// assert_eq!(err.close_code(), 1002);
///
/// let err = ProtocolError::InvalidUtf8;
/// assert_eq!(err.close_code(), 1007);
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A reserved header bit was set without an extension defining it.
    #[error("reserved bits must be empty (found {bits:#04x})")]
    ReservedBits { bits: u8 },

    /// A continuation frame carried the per-message compressed bit.
    #[error("continuation frame cannot have the per-message compressed bit")]
    CompressedContinuation,

    /// A continuation frame arrived with no fragmented message in progress.
    #[error("continuation frame cannot follow current opcode")]
    UnexpectedContinuation,

    /// A new text or binary frame arrived while a fragmented message was active.
    #[error("data frames after the initial data frame must have opcode 0")]
    InterleavedDataFrame,

    /// A control frame had its FIN bit cleared.
    #[error("fragmented control frame (opcode {opcode}) is not supported")]
    FragmentedControlFrame { opcode: u8 },

    /// A control frame announced more than 125 payload bytes. `marker` is
    /// the 7-bit length field, so 126 and 127 stand for an extended length.
    #[error("control frames cannot have more than 125 bytes of data (length marker {marker})")]
    ControlFrameTooLong { marker: u8 },

    /// A control frame carried the per-message compressed bit.
    #[error("control frames cannot have the per-message compressed bit")]
    CompressedControlFrame,

    /// The opcode nibble is reserved or unknown.
    #[error("no handler for opcode {opcode:#x}")]
    UnknownOpcode { opcode: u8 },

    /// A 64-bit length field used its high 32 bits.
    #[error("frame length {length} spans more than 32 bits")]
    PayloadTooLarge { length: u64 },

    /// A close frame payload was exactly one byte long.
    #[error("close frames with data must be at least two bytes long")]
    TruncatedClosePayload,

    /// A close frame carried a status code outside the accepted set.
    #[error("invalid close code {code}")]
    InvalidCloseCode { code: u16 },

    /// A text message or close reason was not valid UTF-8.
    #[error("invalid utf8 sequence")]
    InvalidUtf8,

    /// Decompressing a message payload failed.
    #[error("invalid compressed data: {reason}")]
    InvalidCompressedData { reason: String },
}

impl ProtocolError {
    /// Close status code the connection should be failed with.
    #[must_use]
    pub fn close_code(&self) -> u16 {
        match self {
            Self::InvalidUtf8 | Self::InvalidCompressedData { .. } => close::INVALID_PAYLOAD,
            Self::PayloadTooLarge { .. } => close::POLICY_VIOLATION,
            Self::ReservedBits { .. }
            | Self::CompressedContinuation
            | Self::UnexpectedContinuation
            | Self::InterleavedDataFrame
            | Self::FragmentedControlFrame { .. }
            | Self::ControlFrameTooLong { .. }
            | Self::CompressedControlFrame
            | Self::UnknownOpcode { .. }
            | Self::TruncatedClosePayload
            | Self::InvalidCloseCode { .. } => close::PROTOCOL_ERROR,
        }
    }
}

/// Failures surfaced by the inbound pipeline.
///
/// Almost always a [`ProtocolError`]; an [`ArenaError`] means a payload
/// handle outlived its buffer generation, which is a local fault reported as
/// an internal error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The peer violated the protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A payload handle was resolved after its arena was reclaimed.
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

impl DecodeError {
    /// Close status code the connection should be failed with.
    #[must_use]
    pub fn close_code(&self) -> u16 {
        match self {
            Self::Protocol(err) => err.close_code(),
            Self::Arena(_) => close::INTERNAL_ERROR,
        }
    }

    /// The protocol violation, if this is one.
    #[must_use]
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            Self::Protocol(err) => Some(err),
            Self::Arena(_) => None,
        }
    }
}

/// Top-level error taxonomy for the crate.
#[derive(Debug, Error)]
pub enum WsError {
    /// The inbound stream violated the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A compression stream failed.
    #[error("compression error: {0}")]
    Deflate(#[from] DeflateError),

    /// Extension negotiation failed during connection setup.
    #[error("negotiation error: {0}")]
    Negotiation(#[from] NegotiationError),

    /// A buffer arena handle outlived its generation.
    #[error("arena error: {0}")]
    Arena(#[from] ArenaError),

    /// Transport layer I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<DecodeError> for WsError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Protocol(err) => Self::Protocol(err),
            DecodeError::Arena(err) => Self::Arena(err),
        }
    }
}

impl WsError {
    /// Close code to fail the connection with, when the error has one.
    ///
    /// Transport and negotiation failures have no close code: the socket is
    /// either gone or the handshake never completed.
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::Protocol(err) => Some(err.close_code()),
            Self::Deflate(_) => Some(close::INVALID_PAYLOAD),
            Self::Arena(_) => Some(close::INTERNAL_ERROR),
            Self::Negotiation(_) | Self::Io(_) => None,
        }
    }

    /// Returns the error category as a string for logging and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "protocol",
            Self::Deflate(_) => "deflate",
            Self::Negotiation(_) => "negotiation",
            Self::Arena(_) => "arena",
            Self::Io(_) => "io",
        }
    }
}
