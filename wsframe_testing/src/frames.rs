//! Hand-built wire frames and chunked feeding.

use bytes::{BufMut, Bytes, BytesMut};
use wsframe::{MessageHandler, Receiver};

/// Mask key used by [`masked_frame`].
pub const TEST_MASK_KEY: [u8; 4] = [0x11, 0x22, 0x33, 0x44];

/// Build a frame from its first header byte and payload.
///
/// The length field and masking are written by hand so tests do not depend
/// on the encoder under test. `first_byte` carries FIN, RSV and the opcode.
#[must_use]
pub fn raw_frame(first_byte: u8, payload: &[u8], mask: Option<[u8; 4]>) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(payload.len() + 14);
    buf.put_u8(first_byte);
    let mask_bit = if mask.is_some() { 0x80 } else { 0 };
    match payload.len() {
        len @ 0..=125 => buf.put_u8(mask_bit | len as u8),
        len @ 126..=0xffff => {
            buf.put_u8(mask_bit | 126);
            buf.put_u16(len as u16);
        }
        len => {
            buf.put_u8(mask_bit | 127);
            buf.put_u64(len as u64);
        }
    }
    match mask {
        Some(key) => {
            buf.put_slice(&key);
            buf.extend(payload.iter().enumerate().map(|(i, b)| b ^ key[i % 4]));
        }
        None => buf.put_slice(payload),
    }
    buf.to_vec()
}

/// A client-to-server frame masked with [`TEST_MASK_KEY`].
#[must_use]
pub fn masked_frame(first_byte: u8, payload: &[u8]) -> Vec<u8> {
    raw_frame(first_byte, payload, Some(TEST_MASK_KEY))
}

/// A server-to-client frame.
#[must_use]
pub fn unmasked_frame(first_byte: u8, payload: &[u8]) -> Vec<u8> { raw_frame(first_byte, payload, None) }

/// Close frame payload: big-endian code followed by the reason.
#[must_use]
pub fn close_payload(code: u16, reason: &str) -> Vec<u8> {
    let mut payload = code.to_be_bytes().to_vec();
    payload.extend_from_slice(reason.as_bytes());
    payload
}

/// Feed `wire` to `receiver` in slices of at most `chunk` bytes.
///
/// # Panics
///
/// Panics if `chunk` is zero.
pub async fn feed_chunked<H: MessageHandler>(receiver: &mut Receiver<H>, wire: &[u8], chunk: usize) {
    assert!(chunk > 0, "chunk size must be positive");
    for piece in wire.chunks(chunk) {
        receiver.feed(Bytes::copy_from_slice(piece)).await;
    }
}
