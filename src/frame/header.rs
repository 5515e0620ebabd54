//! Frame header bit layout and payload-length fields.

use bytes::BufMut;

use crate::error::ProtocolError;

/// Final-fragment flag.
pub const FIN: u8 = 0x80;
/// Per-message compressed flag when permessage-deflate is negotiated.
pub const RSV1: u8 = 0x40;
/// Reserved bit 2.
pub const RSV2: u8 = 0x20;
/// Reserved bit 3.
pub const RSV3: u8 = 0x10;
/// Low nibble of the first byte.
pub const OPCODE_MASK: u8 = 0x0f;
/// Masked flag in the second byte.
pub const MASK_BIT: u8 = 0x80;
/// Seven-bit length field in the second byte.
pub const LENGTH_MASK: u8 = 0x7f;

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: u64 = 125;
/// Length marker announcing a 16-bit extended length.
pub const LENGTH_16: u8 = 126;
/// Length marker announcing a 64-bit extended length.
pub const LENGTH_64: u8 = 127;
/// Longest possible header: 2 fixed + 8 length + 4 mask key.
pub const MAX_HEADER_LEN: usize = 14;

/// The fixed two-byte prefix of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// FIN bit.
    pub fin: bool,
    /// RSV1 bit.
    pub rsv1: bool,
    /// RSV2 bit.
    pub rsv2: bool,
    /// RSV3 bit.
    pub rsv3: bool,
    /// Raw opcode nibble; validated separately.
    pub opcode_bits: u8,
    /// MASK bit.
    pub masked: bool,
    /// Seven-bit length field: a length, or [`LENGTH_16`] / [`LENGTH_64`].
    pub length_marker: u8,
}

impl FrameHeader {
    /// Split the first two bytes of a frame into their fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use wsframe::frame::FrameHeader;
    ///
    /// let header = FrameHeader::parse([0x81, 0x85]);
    /// assert!(header.fin);
    /// assert_eq!(header.opcode_bits, 1);
    /// assert!(header.masked);
    /// assert_eq!(header.length_marker, 5);
    /// ```
    #[must_use]
    pub const fn parse(bytes: [u8; 2]) -> Self {
        let [b0, b1] = bytes;
        Self {
            fin: b0 & FIN != 0,
            rsv1: b0 & RSV1 != 0,
            rsv2: b0 & RSV2 != 0,
            rsv3: b0 & RSV3 != 0,
            opcode_bits: b0 & OPCODE_MASK,
            masked: b1 & MASK_BIT != 0,
            length_marker: b1 & LENGTH_MASK,
        }
    }

    /// Reserved bits of the first byte, in place.
    #[must_use]
    pub const fn reserved_bits(&self) -> u8 {
        (if self.rsv1 { RSV1 } else { 0 })
            | (if self.rsv2 { RSV2 } else { 0 })
            | (if self.rsv3 { RSV3 } else { 0 })
    }

    /// Bytes of extended length that follow the fixed prefix (0, 2 or 8).
    #[must_use]
    pub const fn extended_length_size(&self) -> usize {
        match self.length_marker {
            LENGTH_16 => 2,
            LENGTH_64 => 8,
            _ => 0,
        }
    }

    /// Bytes of mask key that follow the length (0 or 4).
    #[must_use]
    pub const fn mask_key_size(&self) -> usize { if self.masked { 4 } else { 0 } }
}

/// Decode an extended payload length of 2 or 8 bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] when a 64-bit length uses its
/// high 32 bits.
pub fn parse_extended_length(bytes: &[u8]) -> Result<u64, ProtocolError> {
    match *bytes {
        [hi, lo] => Ok(u64::from(u16::from_be_bytes([hi, lo]))),
        [a, b, c, d, e, f, g, h] => {
            let length = u64::from_be_bytes([a, b, c, d, e, f, g, h]);
            if length >> 32 != 0 {
                return Err(ProtocolError::PayloadTooLarge { length });
            }
            Ok(length)
        }
        _ => Ok(0),
    }
}

/// Header length needed for a payload of `len` bytes.
#[must_use]
pub const fn header_len(len: usize, masked: bool) -> usize {
    let extended = if len < LENGTH_16 as usize {
        0
    } else if len <= u16::MAX as usize {
        2
    } else {
        8
    };
    2 + extended + if masked { 4 } else { 0 }
}

/// Write a frame header into `dst`.
///
/// `first_byte` already carries FIN, RSV and opcode bits.
pub fn write_header(dst: &mut impl BufMut, first_byte: u8, len: usize, mask: Option<[u8; 4]>) {
    let mask_bit = if mask.is_some() { MASK_BIT } else { 0 };
    dst.put_u8(first_byte);
    if len < usize::from(LENGTH_16) {
        #[expect(clippy::cast_possible_truncation, reason = "len is below 126")]
        dst.put_u8(mask_bit | len as u8);
    } else if let Ok(short) = u16::try_from(len) {
        dst.put_u8(mask_bit | LENGTH_16);
        dst.put_u16(short);
    } else {
        dst.put_u8(mask_bit | LENGTH_64);
        dst.put_u64(len as u64);
    }
    if let Some(key) = mask {
        dst.put_slice(&key);
    }
}
