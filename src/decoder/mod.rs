//! Incremental frame decoding.
//!
//! [`FrameDecoder`] is sans-io: callers [`push`](FrameDecoder::push) bytes
//! as they arrive, in chunks of any size, and pull completed frames with
//! [`next_frame`](FrameDecoder::next_frame). Each frame is parsed through a
//! fixed sequence of exact-length reads:
//!
//! ```text
//! Header(2) -> ExtendedLength(0|2|8) -> MaskKey(0|4) -> Payload(N) -> emit
//! ```
//!
//! Bytes that arrive ahead of the current read wait in an overflow queue
//! and are replayed strictly in arrival order.
//!
//! Payloads live in one of two [`BufferArena`]s: one for single-frame
//! messages and control frames, one for the fragments of a fragmented
//! message. A frame's payload stays readable through
//! [`payload`](FrameDecoder::payload) until the next call to `next_frame`,
//! which reclaims the arena the frame used when it closed a message.

mod cursor;
pub mod state;

use std::collections::VecDeque;

use bytes::{Buf, Bytes};
use tracing::{debug, trace};

use self::cursor::{Expectation, Step, Target};
pub use self::state::{ArenaKind, FragmentState, FrameInfo};
use crate::{
    arena::{ArenaError, ArenaSlice, BufferArena},
    error::{DecodeError, ProtocolError},
    frame::{
        FrameHeader,
        Opcode,
        apply_mask,
        header::{MAX_HEADER_LEN, parse_extended_length},
    },
    metrics,
};

/// Initial size of each payload arena.
pub const DEFAULT_ARENA_SIZE: usize = 1024;

/// Decoder settings fixed at connection setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Accept RSV1 as the per-message compressed bit.
    pub rsv1_allowed: bool,
    /// Initial backing size of each payload arena.
    pub arena_initial_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            rsv1_allowed: false,
            arena_initial_size: DEFAULT_ARENA_SIZE,
        }
    }
}

impl DecoderConfig {
    /// Permit RSV1, as when permessage-deflate was negotiated.
    #[must_use]
    pub fn rsv1_allowed(mut self, allowed: bool) -> Self {
        self.rsv1_allowed = allowed;
        self
    }

    /// Set the initial payload arena size.
    #[must_use]
    pub fn arena_initial_size(mut self, size: usize) -> Self {
        self.arena_initial_size = size;
        self
    }
}

/// A fully received frame whose payload is held by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletedFrame {
    info: FrameInfo,
    len: usize,
    payload: Option<(ArenaKind, ArenaSlice)>,
}

impl CompletedFrame {
    /// Opcode on the wire.
    #[must_use]
    pub const fn opcode(&self) -> Opcode { self.info.opcode }

    /// Opcode of the message this frame belongs to.
    #[must_use]
    pub const fn message_opcode(&self) -> Opcode { self.info.message }

    /// Whether this frame ends its message.
    #[must_use]
    pub const fn is_final(&self) -> bool { self.info.fin }

    /// Whether the message was sent compressed.
    #[must_use]
    pub const fn is_compressed(&self) -> bool { self.info.compressed }

    /// Whether the payload was masked on the wire.
    #[must_use]
    pub const fn is_masked(&self) -> bool { self.info.masked }

    /// Payload length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize { self.len }

    /// Whether the payload is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.len == 0 }

    /// Header details of the frame.
    #[must_use]
    pub const fn info(&self) -> &FrameInfo { &self.info }

    /// Arena holding the payload; `None` for empty payloads.
    #[must_use]
    pub fn arena_kind(&self) -> Option<ArenaKind> { self.payload.map(|(kind, _)| kind) }
}

#[derive(Clone, Copy, Debug)]
struct PendingFrame {
    info: FrameInfo,
    extended: usize,
    len: usize,
    mask: Option<[u8; 4]>,
}

/// Incremental WebSocket frame decoder.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use wsframe::{decoder::FrameDecoder, frame::Opcode};
///
/// let mut decoder = FrameDecoder::default();
/// decoder.push(Bytes::from_static(&[0x81, 0x02, b'h']));
/// assert!(decoder.next_frame().is_none());
///
/// decoder.push(Bytes::from_static(b"i"));
/// let frame = decoder.next_frame().expect("frame complete")?;
/// assert_eq!(frame.opcode(), Opcode::Text);
/// assert_eq!(decoder.payload(&frame)?, b"hi");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    config: DecoderConfig,
    scratch: [u8; MAX_HEADER_LEN],
    expectation: Expectation,
    overflow: VecDeque<Bytes>,
    fragments: FragmentState,
    pending: Option<PendingFrame>,
    unfragmented: BufferArena,
    fragmented: BufferArena,
    reclaim: Option<ArenaKind>,
    closed: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self { Self::new(DecoderConfig::default()) }
}

impl FrameDecoder {
    /// Create a decoder waiting for the first frame header.
    #[must_use]
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            scratch: [0; MAX_HEADER_LEN],
            expectation: Expectation::header(),
            overflow: VecDeque::new(),
            fragments: FragmentState::default(),
            pending: None,
            unfragmented: BufferArena::with_default_policy(config.arena_initial_size),
            fragmented: BufferArena::with_default_policy(config.arena_initial_size),
            reclaim: None,
            closed: false,
        }
    }

    /// Settings the decoder was built with.
    #[must_use]
    pub const fn config(&self) -> &DecoderConfig { &self.config }

    /// Current fragmentation state.
    #[must_use]
    pub const fn fragments(&self) -> &FragmentState { &self.fragments }

    /// Bytes received but not yet consumed by the cursor.
    #[must_use]
    pub fn buffered(&self) -> usize { self.overflow.iter().map(Bytes::len).sum() }

    /// Whether decoding stopped after a close frame.
    #[must_use]
    pub const fn is_closed(&self) -> bool { self.closed }

    /// Arena backing payloads of the given kind.
    #[must_use]
    pub const fn arena(&self, kind: ArenaKind) -> &BufferArena {
        match kind {
            ArenaKind::Unfragmented => &self.unfragmented,
            ArenaKind::Fragmented => &self.fragmented,
        }
    }

    /// Queue received bytes. Empty chunks and input after
    /// [`close`](Self::close) are ignored.
    pub fn push(&mut self, data: Bytes) {
        if self.closed || data.is_empty() {
            return;
        }
        self.overflow.push_back(data);
    }

    /// Decode the next complete frame from the bytes received so far.
    ///
    /// Returns `None` when more input is needed. After an error the
    /// decoder has already been [`reset`](Self::reset); the error is
    /// returned exactly once.
    pub fn next_frame(&mut self) -> Option<Result<CompletedFrame, DecodeError>> {
        if self.closed {
            return None;
        }
        self.reclaim_previous();
        loop {
            if let Err(err) = self.fill() {
                return Some(Err(self.fail(err.into())));
            }
            if !self.expectation.is_satisfied() {
                return None;
            }
            match self.advance() {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => {}
                Err(err) => return Some(Err(self.fail(err))),
            }
        }
    }

    /// Borrow the unmasked payload of `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::StaleSlice`] once `next_frame` has been called
    /// again and the payload's arena was reclaimed.
    pub fn payload(&self, frame: &CompletedFrame) -> Result<&[u8], ArenaError> {
        match &frame.payload {
            Some((kind, slice)) => self.arena(*kind).get(slice),
            None => Ok(&[]),
        }
    }

    /// Drop all buffered input and partial state, waiting for a new header.
    pub fn reset(&mut self) {
        self.expectation = Expectation::header();
        self.overflow.clear();
        self.fragments = FragmentState::default();
        self.pending = None;
        self.reclaim = None;
        self.unfragmented.reclaim(true);
        self.fragmented.reclaim(true);
    }

    /// Reset and stop decoding; used once a close frame was handled.
    pub fn close(&mut self) {
        self.reset();
        self.closed = true;
    }

    fn reclaim_previous(&mut self) {
        match self.reclaim.take() {
            Some(ArenaKind::Unfragmented) => self.unfragmented.reclaim(true),
            Some(ArenaKind::Fragmented) => self.fragmented.reclaim(false),
            None => {}
        }
    }

    fn fail(&mut self, err: DecodeError) -> DecodeError {
        debug!(error = %err, code = err.close_code(), "frame decoding failed");
        metrics::inc_protocol_errors(err.close_code());
        self.reset();
        err
    }

    // Copy queued input into the current expectation in arrival order.
    fn fill(&mut self) -> Result<(), ArenaError> {
        while !self.expectation.is_satisfied() {
            let Some(mut chunk) = self.overflow.pop_front() else {
                return Ok(());
            };
            let take = chunk.len().min(self.expectation.remaining());
            let at = self.expectation.filled;
            let dst = match self.expectation.target {
                Target::Scratch { start } => &mut self.scratch[start + at..start + at + take],
                Target::Arena { kind, slice } => {
                    let arena = match kind {
                        ArenaKind::Unfragmented => &mut self.unfragmented,
                        ArenaKind::Fragmented => &mut self.fragmented,
                    };
                    &mut arena.get_mut(&slice)?[at..at + take]
                }
            };
            dst.copy_from_slice(&chunk[..take]);
            chunk.advance(take);
            self.expectation.filled += take;
            if !chunk.is_empty() {
                self.overflow.push_front(chunk);
            }
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<CompletedFrame>, DecodeError> {
        match self.expectation.step {
            Step::Header => {
                let header = FrameHeader::parse([self.scratch[0], self.scratch[1]]);
                let info = self.fragments.validate(&header, self.config.rsv1_allowed)?;
                let extended = header.extended_length_size();
                let pending = PendingFrame {
                    info,
                    extended,
                    len: usize::from(header.length_marker),
                    mask: None,
                };
                self.pending = Some(pending);
                if extended > 0 {
                    self.expect(Step::ExtendedLength, Target::Scratch { start: 2 }, extended);
                    return Ok(None);
                }
                self.after_length(pending)
            }
            Step::ExtendedLength => {
                let Some(mut pending) = self.pending else {
                    return Ok(None);
                };
                let field = &self.scratch[2..2 + pending.extended];
                let length = parse_extended_length(field)?;
                pending.len = usize::try_from(length)
                    .map_err(|_| ProtocolError::PayloadTooLarge { length })?;
                self.pending = Some(pending);
                self.after_length(pending)
            }
            Step::MaskKey => {
                let Some(mut pending) = self.pending else {
                    return Ok(None);
                };
                let start = 2 + pending.extended;
                let mut key = [0; 4];
                key.copy_from_slice(&self.scratch[start..start + 4]);
                pending.mask = Some(key);
                self.pending = Some(pending);
                self.expect_payload(pending)
            }
            Step::Payload => {
                let Some(pending) = self.pending else {
                    return Ok(None);
                };
                let Target::Arena { kind, slice } = self.expectation.target else {
                    return Ok(None);
                };
                if let Some(key) = pending.mask {
                    let arena = match kind {
                        ArenaKind::Unfragmented => &mut self.unfragmented,
                        ArenaKind::Fragmented => &mut self.fragmented,
                    };
                    apply_mask(arena.get_mut(&slice)?, key);
                }
                Ok(Some(self.emit(pending, Some((kind, slice)))))
            }
        }
    }

    fn after_length(&mut self, pending: PendingFrame) -> Result<Option<CompletedFrame>, DecodeError> {
        if pending.info.masked {
            self.expect(
                Step::MaskKey,
                Target::Scratch {
                    start: 2 + pending.extended,
                },
                4,
            );
            return Ok(None);
        }
        self.expect_payload(pending)
    }

    fn expect_payload(&mut self, pending: PendingFrame) -> Result<Option<CompletedFrame>, DecodeError> {
        if pending.len == 0 {
            return Ok(Some(self.emit(pending, None)));
        }
        let kind = pending.info.arena;
        let slice = match kind {
            ArenaKind::Unfragmented => self.unfragmented.acquire(pending.len),
            ArenaKind::Fragmented => self.fragmented.acquire(pending.len),
        };
        self.expect(Step::Payload, Target::Arena { kind, slice }, pending.len);
        Ok(None)
    }

    fn expect(&mut self, step: Step, target: Target, len: usize) {
        self.expectation = Expectation::new(step, target, len);
    }

    fn emit(&mut self, pending: PendingFrame, payload: Option<(ArenaKind, ArenaSlice)>) -> CompletedFrame {
        let info = pending.info;
        self.fragments.complete(&info);
        self.reclaim = match info.arena {
            ArenaKind::Unfragmented => Some(ArenaKind::Unfragmented),
            ArenaKind::Fragmented if info.fin => Some(ArenaKind::Fragmented),
            ArenaKind::Fragmented => None,
        };
        self.pending = None;
        self.expectation = Expectation::header();
        metrics::inc_frames(metrics::Direction::Inbound);
        trace!(
            opcode = ?info.opcode,
            fin = info.fin,
            len = pending.len,
            "decoded frame"
        );
        CompletedFrame {
            info,
            len: pending.len,
            payload,
        }
    }
}
