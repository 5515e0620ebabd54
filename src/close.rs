//! Close status codes and close-frame payloads.
//!
//! A close frame carries an optional payload of a big-endian status code
//! followed by a UTF-8 reason. [`parse_close_payload`] validates inbound
//! payloads and [`encode_close_payload`] builds outbound ones. The close
//! handshake is bounded: [`await_close_ack`] gives the owning connection a
//! deadline after which it should force-terminate the socket.

use std::{future::Future, time::Duration};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::{error::ProtocolError, validation::text_from_slice};

/// Normal closure.
pub const NORMAL: u16 = 1000;
/// Endpoint going away.
pub const GOING_AWAY: u16 = 1001;
/// Protocol violation.
pub const PROTOCOL_ERROR: u16 = 1002;
/// Unsupported data type.
pub const UNSUPPORTED_DATA: u16 = 1003;
/// Payload inconsistent with the message type (e.g. invalid UTF-8).
pub const INVALID_PAYLOAD: u16 = 1007;
/// Policy violation; also used for frames too large to handle.
pub const POLICY_VIOLATION: u16 = 1008;
/// Message too big.
pub const MESSAGE_TOO_BIG: u16 = 1009;
/// Client expected an extension the server did not negotiate.
pub const MANDATORY_EXTENSION: u16 = 1010;
/// Unexpected server condition.
pub const INTERNAL_ERROR: u16 = 1011;

/// How long a peer may take to acknowledge a close before the connection is
/// terminated.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether `code` may appear on the wire in a close frame.
///
/// Codes 1004-1006 are reserved for local use and never sent; 3000-4999 are
/// registered and private-use ranges.
#[must_use]
pub fn is_valid_close_code(code: u16) -> bool {
    matches!(code, 1000..=1003 | 1007..=1011 | 3000..=4999)
}

/// Build a close payload from a status code and an optional reason.
///
/// # Examples
///
/// ```
/// use wsframe::close::encode_close_payload;
///
/// let payload = encode_close_payload(1000, "bye");
/// assert_eq!(&payload[..], b"\x03\xe8bye");
/// ```
#[must_use]
pub fn encode_close_payload(code: u16, reason: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + reason.len());
    buf.put_u16(code);
    buf.put_slice(reason.as_bytes());
    buf.freeze()
}

/// Parse an inbound close payload into its status code and reason.
///
/// An empty payload means the peer sent no status, which is treated as a
/// normal closure.
///
/// # Errors
///
/// Returns [`ProtocolError::TruncatedClosePayload`] for a one-byte payload,
/// [`ProtocolError::InvalidCloseCode`] for an unrecognised status code, and
/// [`ProtocolError::InvalidUtf8`] when the reason is not valid UTF-8.
pub fn parse_close_payload(payload: &[u8]) -> Result<(u16, String), ProtocolError> {
    match payload.len() {
        0 => return Ok((NORMAL, String::new())),
        1 => return Err(ProtocolError::TruncatedClosePayload),
        _ => {}
    }
    let mut cursor = payload;
    let code = cursor.get_u16();
    if !is_valid_close_code(code) {
        return Err(ProtocolError::InvalidCloseCode { code });
    }
    let reason = text_from_slice(cursor)?;
    Ok((code, reason))
}

/// The peer did not acknowledge a close within the allotted time.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("close handshake not acknowledged within {0:?}")]
pub struct CloseTimeout(pub Duration);

/// Wait for a close acknowledgement, giving up after [`CLOSE_TIMEOUT`].
///
/// # Errors
///
/// Returns [`CloseTimeout`] if `ack` does not resolve in time; the caller
/// should then terminate the connection.
pub async fn await_close_ack<F: Future>(ack: F) -> Result<F::Output, CloseTimeout> {
    await_close_ack_within(CLOSE_TIMEOUT, ack).await
}

/// Wait for a close acknowledgement with a custom deadline.
///
/// # Errors
///
/// Returns [`CloseTimeout`] if `ack` does not resolve within `limit`.
pub async fn await_close_ack_within<F: Future>(
    limit: Duration,
    ack: F,
) -> Result<F::Output, CloseTimeout> {
    tokio::time::timeout(limit, ack)
        .await
        .map_err(|_| CloseTimeout(limit))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1000, true)]
    #[case(1003, true)]
    #[case(1004, false)]
    #[case(1005, false)]
    #[case(1006, false)]
    #[case(1011, true)]
    #[case(1016, false)]
    #[case(2999, false)]
    #[case(3000, true)]
    #[case(4999, true)]
    #[case(5000, false)]
    fn close_code_membership(#[case] code: u16, #[case] valid: bool) {
        assert_eq!(is_valid_close_code(code), valid);
    }

    #[test]
    fn empty_payload_defaults_to_normal() {
        assert_eq!(parse_close_payload(&[]), Ok((1000, String::new())));
    }

    #[test]
    fn status_without_reason_parses() {
        assert_eq!(parse_close_payload(&[0x03, 0xe8]), Ok((1000, String::new())));
    }

    #[test]
    fn one_byte_payload_is_rejected() {
        assert_eq!(
            parse_close_payload(&[0x03]),
            Err(ProtocolError::TruncatedClosePayload)
        );
    }

    #[test]
    fn reserved_code_is_rejected() {
        assert_eq!(
            parse_close_payload(&[0x03, 0xed]),
            Err(ProtocolError::InvalidCloseCode { code: 1005 })
        );
    }

    #[test]
    fn invalid_reason_is_rejected() {
        assert_eq!(
            parse_close_payload(&[0x03, 0xe8, 0xff, 0xfe]),
            Err(ProtocolError::InvalidUtf8)
        );
    }

    #[test]
    fn encoded_payload_parses_back() {
        let payload = encode_close_payload(4001, "going");
        assert_eq!(parse_close_payload(&payload), Ok((4001, "going".to_owned())));
    }

    #[tokio::test(start_paused = true)]
    async fn close_ack_times_out_after_thirty_seconds() {
        let started = tokio::time::Instant::now();
        let result = await_close_ack(std::future::pending::<()>()).await;
        assert_eq!(result, Err(CloseTimeout(CLOSE_TIMEOUT)));
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn close_ack_resolves_before_deadline() {
        let result = await_close_ack_within(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(result, Ok(7));
    }
}
