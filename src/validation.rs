//! UTF-8 validation used for text messages and close reasons.
//!
//! Validation failures surface as [`ProtocolError::InvalidUtf8`], which
//! closes the connection with status 1007.

use crate::error::ProtocolError;

/// Whether `bytes` form a complete, valid UTF-8 sequence.
#[must_use]
pub fn is_valid_utf8(bytes: &[u8]) -> bool { std::str::from_utf8(bytes).is_ok() }

/// Validate and take ownership of a reassembled text payload.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidUtf8`] if the payload is not UTF-8.
pub fn text_from_vec(bytes: Vec<u8>) -> Result<String, ProtocolError> {
    String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Validate a borrowed payload and copy it into an owned string.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidUtf8`] if the payload is not UTF-8.
pub fn text_from_slice(bytes: &[u8]) -> Result<String, ProtocolError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| ProtocolError::InvalidUtf8)
}
