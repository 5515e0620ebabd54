//! Single-frame encoding.
//!
//! [`FrameEncoder`] turns one payload into wire bytes. Small payloads are
//! copied behind the header into a single buffer; large ones are returned
//! as a separate header and body so the body is written without a copy.
//! A masked body can only stay separate when the encoder owns it uniquely
//! and may mask it in place; shared payloads are always copied.

use bytes::{BufMut, Bytes, BytesMut};

use crate::frame::{
    Opcode,
    apply_mask,
    header::{FIN, RSV1},
    header_len,
    mask_into,
    write_header,
};

/// Payloads below this size are merged with their header.
pub const MERGE_THRESHOLD: usize = 32 * 1024;

/// Per-frame header flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameOptions {
    /// Set FIN.
    pub fin: bool,
    /// Mask the payload.
    pub mask: bool,
    /// Set RSV1 (compressed message).
    pub rsv1: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            fin: true,
            mask: false,
            rsv1: false,
        }
    }
}

/// Wire bytes of one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodedFrame {
    /// Header and payload in one buffer.
    Merged(Bytes),
    /// Header and payload as separate buffers, written back to back.
    Split {
        /// Frame header, including any mask key.
        header: Bytes,
        /// Payload, already masked if required.
        body: Bytes,
    },
}

impl EncodedFrame {
    /// Total encoded length.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Merged(buf) => buf.len(),
            Self::Split { header, body } => header.len() + body.len(),
        }
    }

    /// Whether the frame has no bytes; never true for a valid frame.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// The buffers to write, in order.
    #[must_use]
    pub fn chunks(&self) -> Vec<&Bytes> {
        match self {
            Self::Merged(buf) => vec![buf],
            Self::Split { header, body } => vec![header, body],
        }
    }

    /// Concatenate into one contiguous buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Merged(buf) => buf.clone(),
            Self::Split { header, body } => {
                let mut buf = BytesMut::with_capacity(header.len() + body.len());
                buf.extend_from_slice(header);
                buf.extend_from_slice(body);
                buf.freeze()
            }
        }
    }
}

/// Builds frames, reusing one random mask key for the encoder's lifetime.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use wsframe::{
///     encoder::{FrameEncoder, FrameOptions},
///     frame::Opcode,
/// };
///
/// let mut encoder = FrameEncoder::new();
/// let frame = encoder.encode(Opcode::Text, Bytes::from_static(b"Hello"), FrameOptions::default());
/// assert_eq!(&frame.to_bytes()[..], b"\x81\x05Hello");
/// ```
#[derive(Clone, Debug)]
pub struct FrameEncoder {
    mask_key: Option<[u8; 4]>,
    merge_threshold: usize,
}

impl Default for FrameEncoder {
    fn default() -> Self { Self::new() }
}

impl FrameEncoder {
    /// Create an encoder; the mask key is drawn on first use.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mask_key: None,
            merge_threshold: MERGE_THRESHOLD,
        }
    }

    /// Use a fixed mask key instead of a random one.
    #[must_use]
    pub const fn with_mask_key(mut self, key: [u8; 4]) -> Self {
        self.mask_key = Some(key);
        self
    }

    /// Change the size below which payloads are merged with their header.
    #[must_use]
    pub const fn with_merge_threshold(mut self, threshold: usize) -> Self {
        self.merge_threshold = threshold;
        self
    }

    /// The mask key used for masked frames.
    pub fn mask_key(&mut self) -> [u8; 4] { *self.mask_key.get_or_insert_with(rand::random) }

    /// Encode one frame.
    ///
    /// An empty payload produces only the header (and mask key).
    pub fn encode(&mut self, opcode: Opcode, payload: Bytes, options: FrameOptions) -> EncodedFrame {
        let mut first_byte = opcode.as_u8();
        if options.fin {
            first_byte |= FIN;
        }
        if options.rsv1 {
            first_byte |= RSV1;
        }
        let mask = options.mask.then(|| self.mask_key());
        let len = payload.len();
        let head_len = header_len(len, mask.is_some());

        if len < self.merge_threshold {
            return EncodedFrame::Merged(merged(first_byte, payload, mask, head_len));
        }
        let Some(key) = mask else {
            let mut header = BytesMut::with_capacity(head_len);
            write_header(&mut header, first_byte, len, None);
            return EncodedFrame::Split {
                header: header.freeze(),
                body: payload,
            };
        };
        match payload.try_into_mut() {
            Ok(mut body) => {
                apply_mask(&mut body, key);
                let mut header = BytesMut::with_capacity(head_len);
                write_header(&mut header, first_byte, len, Some(key));
                EncodedFrame::Split {
                    header: header.freeze(),
                    body: body.freeze(),
                }
            }
            Err(shared) => EncodedFrame::Merged(merged(first_byte, shared, mask, head_len)),
        }
    }
}

fn merged(first_byte: u8, payload: Bytes, mask: Option<[u8; 4]>, head_len: usize) -> Bytes {
    let len = payload.len();
    let mut buf = BytesMut::with_capacity(head_len + len);
    write_header(&mut buf, first_byte, len, mask);
    match mask {
        Some(key) => {
            let start = buf.len();
            buf.resize(start + len, 0);
            mask_into(&mut buf[start..], &payload, key);
        }
        None => buf.put_slice(&payload),
    }
    buf.freeze()
}
