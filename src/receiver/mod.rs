//! Inbound message pipeline.
//!
//! [`Receiver`] owns a [`FrameDecoder`] and drives every completed frame
//! through decompression, reassembly, validation and the
//! [`MessageHandler`] callbacks. Frames are taken from the decoder one at a
//! time and each is fully processed, including any suspension inside the
//! codec or the handler, before the next is decoded; delivery order
//! therefore always matches wire order.
//!
//! The owning connection can stop the pipeline with [`Receiver::terminate`]
//! or by cancelling the token from [`Receiver::shutdown_token`]. Work that
//! is in progress when that happens finishes its current await and then
//! delivers nothing further.

use bytes::{Bytes, BytesMut};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{
    close::parse_close_payload,
    decoder::{CompletedFrame, DEFAULT_ARENA_SIZE, DecoderConfig, FrameDecoder},
    deflate::Decompressor,
    error::{DecodeError, ProtocolError},
    frame::Opcode,
    handler::{MessageFlags, MessageHandler},
    metrics,
    validation::text_from_vec,
};

/// Receiver settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Initial backing size of each decoder payload arena.
    pub arena_initial_size: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            arena_initial_size: DEFAULT_ARENA_SIZE,
        }
    }
}

impl ReceiverConfig {
    /// Set the initial payload arena size.
    #[must_use]
    pub fn arena_initial_size(mut self, size: usize) -> Self {
        self.arena_initial_size = size;
        self
    }

    fn decoder(self, rsv1_allowed: bool) -> DecoderConfig {
        DecoderConfig::default()
            .arena_initial_size(self.arena_initial_size)
            .rsv1_allowed(rsv1_allowed)
    }
}

/// Turns inbound bytes into [`MessageHandler`] callbacks.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use wsframe::{
///     handler::{MessageFlags, MessageHandler},
///     receiver::{Receiver, ReceiverConfig},
/// };
///
/// #[derive(Default)]
/// struct Collect(Vec<String>);
///
/// #[async_trait]
/// impl MessageHandler for Collect {
///     async fn on_text(&mut self, text: String, _flags: MessageFlags) { self.0.push(text); }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let mut receiver = Receiver::new(Collect::default(), ReceiverConfig::default());
/// receiver.feed(Bytes::from_static(&[0x81, 0x02, b'h'])).await;
/// receiver.feed(Bytes::from_static(b"i")).await;
/// assert_eq!(receiver.handler().0, vec!["hi".to_owned()]);
/// # });
/// ```
#[derive(Debug)]
pub struct Receiver<H> {
    config: ReceiverConfig,
    decoder: FrameDecoder,
    handler: H,
    decompressor: Option<Decompressor>,
    message: Vec<Bytes>,
    shutdown: CancellationToken,
}

impl<H: MessageHandler> Receiver<H> {
    /// Create a receiver without permessage-deflate.
    #[must_use]
    pub fn new(handler: H, config: ReceiverConfig) -> Self {
        Self {
            config,
            decoder: FrameDecoder::new(config.decoder(false)),
            handler,
            decompressor: None,
            message: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Enable permessage-deflate: RSV1 becomes the compressed bit and
    /// flagged messages are inflated with `decompressor`.
    #[must_use]
    pub fn with_decompressor(mut self, decompressor: Decompressor) -> Self {
        self.decoder = FrameDecoder::new(self.config.decoder(true));
        self.decompressor = Some(decompressor);
        self
    }

    /// Share an existing shutdown token, e.g. the connection's.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Token that marks this receiver dead when cancelled.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken { self.shutdown.clone() }

    /// Mark the receiver dead; nothing further is delivered.
    pub fn terminate(&self) { self.shutdown.cancel(); }

    /// Whether the receiver was terminated.
    #[must_use]
    pub fn is_dead(&self) -> bool { self.shutdown.is_cancelled() }

    /// Whether a close frame was delivered; later input is ignored.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.decoder.is_closed() }

    /// The underlying decoder.
    #[must_use]
    pub fn decoder(&self) -> &FrameDecoder { &self.decoder }

    /// The message handler.
    #[must_use]
    pub fn handler(&self) -> &H { &self.handler }

    /// Mutable access to the message handler.
    pub fn handler_mut(&mut self) -> &mut H { &mut self.handler }

    /// Consume the receiver, returning its handler.
    #[must_use]
    pub fn into_handler(self) -> H { self.handler }

    /// Accept a chunk of inbound bytes and deliver every message it
    /// completes.
    ///
    /// Returns once all complete frames have been processed; a partial frame
    /// stays buffered until more bytes arrive.
    pub async fn feed(&mut self, data: Bytes) {
        if self.is_dead() {
            return;
        }
        self.decoder.push(data);
        while !self.is_dead() {
            let Some(result) = self.decoder.next_frame() else {
                break;
            };
            let outcome = match result {
                Ok(frame) => self.process(frame).await.inspect_err(|err| {
                    metrics::inc_protocol_errors(err.close_code());
                }),
                Err(err) => Err(err),
            };
            if let Err(err) = outcome {
                self.fail(err).await;
            }
        }
    }

    async fn fail(&mut self, err: DecodeError) {
        debug!(error = %err, code = err.close_code(), "inbound stream failed");
        self.message.clear();
        self.decoder.reset();
        if self.is_dead() {
            return;
        }
        self.handler.on_error(&err).await;
    }

    async fn process(&mut self, frame: CompletedFrame) -> Result<(), DecodeError> {
        let flags = MessageFlags {
            masked: frame.is_masked(),
            binary: frame.message_opcode() != Opcode::Text,
        };
        match frame.message_opcode() {
            Opcode::Text | Opcode::Binary => self.data_frame(&frame, flags).await,
            Opcode::Close => {
                let (code, reason) = parse_close_payload(self.decoder.payload(&frame)?)?;
                trace!(code, "close frame received");
                self.handler.on_close(code, reason, flags).await;
                self.message.clear();
                self.decoder.close();
                Ok(())
            }
            Opcode::Ping => {
                let data = Bytes::copy_from_slice(self.decoder.payload(&frame)?);
                self.handler.on_ping(data, flags).await;
                Ok(())
            }
            Opcode::Pong => {
                let data = Bytes::copy_from_slice(self.decoder.payload(&frame)?);
                self.handler.on_pong(data, flags).await;
                Ok(())
            }
            Opcode::Continuation => Err(ProtocolError::UnexpectedContinuation.into()),
        }
    }

    async fn data_frame(&mut self, frame: &CompletedFrame, flags: MessageFlags) -> Result<(), DecodeError> {
        let chunk = if frame.is_compressed() {
            let input = self.decoder.payload(frame)?;
            let Some(inflate) = self.decompressor.as_mut() else {
                return Err(ProtocolError::InvalidCompressedData {
                    reason: "compression was not negotiated".to_owned(),
                }
                .into());
            };
            inflate
                .decompress(input, frame.is_final())
                .await
                .map_err(|err| ProtocolError::InvalidCompressedData {
                    reason: err.to_string(),
                })?
        } else {
            Bytes::copy_from_slice(self.decoder.payload(frame)?)
        };
        if self.is_dead() {
            return Ok(());
        }
        if !chunk.is_empty() {
            self.message.push(chunk);
        }
        if !frame.is_final() {
            return Ok(());
        }

        let message = concat(std::mem::take(&mut self.message));
        trace!(
            opcode = ?frame.message_opcode(),
            len = message.len(),
            "message complete"
        );
        if flags.binary {
            self.handler.on_binary(message, flags).await;
        } else {
            let text = text_from_vec(Vec::from(message))?;
            self.handler.on_text(text, flags).await;
        }
        Ok(())
    }
}

fn concat(mut chunks: Vec<Bytes>) -> Bytes {
    match chunks.len() {
        0 => Bytes::new(),
        1 => chunks.pop().unwrap_or_default(),
        _ => {
            let total = chunks.iter().map(Bytes::len).sum();
            let mut buf = BytesMut::with_capacity(total);
            for chunk in &chunks {
                buf.extend_from_slice(chunk);
            }
            buf.freeze()
        }
    }
}
