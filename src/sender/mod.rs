//! Outbound message framing.
//!
//! [`Sender`] writes messages to an [`AsyncWrite`] transport one frame at a
//! time. It tracks whether the next data frame opens a new message so that
//! fragmented sends get continuation opcodes, and it owns the outbound half
//! of permessage-deflate. Every method takes `&mut self` and finishes its
//! write before returning, so frames from different sends never interleave.
//! [`OutboundQueue`] wraps a sender in a task for callers that cannot hold a
//! mutable borrow.

use std::io;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::{
    close::{self, encode_close_payload, is_valid_close_code},
    deflate::{Compressor, DeflateError},
    encoder::{FrameEncoder, FrameOptions},
    frame::{Opcode, header::MAX_CONTROL_PAYLOAD},
    metrics::{self, Direction},
};

mod queue;

pub use queue::{Completion, OutboundHandle, OutboundQueue};

/// Options for one call to [`Sender::send`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendOptions {
    /// Last fragment of the message.
    pub fin: bool,
    /// Mask the frame (required for clients).
    pub mask: bool,
    /// Compress the message, if permessage-deflate was negotiated. Only the
    /// first fragment's value counts.
    pub compress: bool,
    /// Binary rather than text.
    pub binary: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            fin: true,
            mask: false,
            compress: false,
            binary: false,
        }
    }
}

/// Failures while sending.
#[derive(Debug, Error)]
pub enum SendError {
    /// The close status code may not be sent on the wire.
    #[error("invalid close code {code}")]
    InvalidCloseCode { code: u16 },

    /// A control frame payload exceeded 125 bytes.
    #[error("control frame payload of {len} bytes exceeds 125")]
    ControlPayloadTooLong { len: usize },

    /// Compressing the payload failed.
    #[error("compression failed: {0}")]
    Compression(#[from] DeflateError),

    /// Writing to the transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The outbound queue has stopped.
    #[error("outbound queue closed")]
    Closed,
}

/// Writes frames to a transport.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use wsframe::sender::{SendOptions, Sender};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let mut sender = Sender::new(Vec::new());
/// sender.send(Bytes::from_static(b"hi"), SendOptions::default()).await.unwrap();
/// assert_eq!(sender.get_ref(), b"\x81\x02hi");
/// # });
/// ```
#[derive(Debug)]
pub struct Sender<W> {
    writer: W,
    encoder: FrameEncoder,
    compressor: Option<Compressor>,
    first_fragment: bool,
    compress_message: bool,
}

impl<W: AsyncWrite + Unpin + Send> Sender<W> {
    /// Create a sender without permessage-deflate.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            encoder: FrameEncoder::new(),
            compressor: None,
            first_fragment: true,
            compress_message: false,
        }
    }

    /// Compress messages sent with [`SendOptions::compress`].
    #[must_use]
    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Replace the frame encoder, e.g. to pin the mask key.
    #[must_use]
    pub fn with_encoder(mut self, encoder: FrameEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// The underlying transport.
    #[must_use]
    pub fn get_ref(&self) -> &W { &self.writer }

    /// Consume the sender, returning the transport.
    #[must_use]
    pub fn into_inner(self) -> W { self.writer }

    /// Send one data frame.
    ///
    /// The first frame of a message decides its opcode and whether it is
    /// compressed; later fragments are continuations without RSV1.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Compression`] if deflate fails, in which case
    /// nothing is written and the next call still opens a message, and
    /// [`SendError::Io`] if the transport write fails.
    pub async fn send(&mut self, payload: Bytes, options: SendOptions) -> Result<(), SendError> {
        let opens_message = self.first_fragment;
        let (opcode, compress) = if opens_message {
            let opcode = if options.binary {
                Opcode::Binary
            } else {
                Opcode::Text
            };
            (opcode, options.compress && self.compressor.is_some())
        } else {
            (Opcode::Continuation, self.compress_message)
        };

        // Fragment state only advances once the payload is ready to write.
        let payload = match self.compressor.as_mut() {
            Some(deflate) if compress => deflate.compress(payload, options.fin).await?,
            _ => payload,
        };
        if opens_message {
            self.compress_message = compress;
        }
        self.first_fragment = options.fin;

        let frame = FrameOptions {
            fin: options.fin,
            mask: options.mask,
            rsv1: opens_message && compress,
        };
        self.write_frame(opcode, payload, frame).await
    }

    /// Send a ping.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::ControlPayloadTooLong`] for payloads over 125
    /// bytes and [`SendError::Io`] if the write fails.
    pub async fn ping(&mut self, payload: Bytes, mask: bool) -> Result<(), SendError> {
        self.control(Opcode::Ping, payload, mask).await
    }

    /// Send a pong.
    ///
    /// # Errors
    ///
    /// As for [`Sender::ping`].
    pub async fn pong(&mut self, payload: Bytes, mask: bool) -> Result<(), SendError> {
        self.control(Opcode::Pong, payload, mask).await
    }

    /// Send a close frame; `code` defaults to 1000.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::InvalidCloseCode`] before writing anything if the
    /// code may not appear on the wire, and otherwise as for
    /// [`Sender::ping`].
    pub async fn close(&mut self, code: Option<u16>, reason: &str, mask: bool) -> Result<(), SendError> {
        let payload = close_frame_payload(code, reason)?;
        self.close_with_payload(payload, mask).await
    }

    pub(crate) async fn close_with_payload(&mut self, payload: Bytes, mask: bool) -> Result<(), SendError> {
        self.control(Opcode::Close, payload, mask).await
    }

    async fn control(&mut self, opcode: Opcode, payload: Bytes, mask: bool) -> Result<(), SendError> {
        check_control_len(&payload)?;
        let frame = FrameOptions {
            fin: true,
            mask,
            rsv1: false,
        };
        self.write_frame(opcode, payload, frame).await
    }

    async fn write_frame(
        &mut self,
        opcode: Opcode,
        payload: Bytes,
        options: FrameOptions,
    ) -> Result<(), SendError> {
        let frame = self.encoder.encode(opcode, payload, options);
        for chunk in frame.chunks() {
            self.writer.write_all(chunk).await?;
        }
        self.writer.flush().await?;
        trace!(?opcode, len = frame.len(), fin = options.fin, "frame written");
        metrics::inc_frames(Direction::Outbound);
        Ok(())
    }
}

pub(crate) fn close_frame_payload(code: Option<u16>, reason: &str) -> Result<Bytes, SendError> {
    let code = code.unwrap_or(close::NORMAL);
    if !is_valid_close_code(code) {
        return Err(SendError::InvalidCloseCode { code });
    }
    let payload = encode_close_payload(code, reason);
    check_control_len(&payload)?;
    Ok(payload)
}

pub(crate) fn check_control_len(payload: &[u8]) -> Result<(), SendError> {
    if payload.len() as u64 > MAX_CONTROL_PAYLOAD {
        return Err(SendError::ControlPayloadTooLong { len: payload.len() });
    }
    Ok(())
}
