//! Fragmentation state and per-frame header validation.

use crate::{
    error::ProtocolError,
    frame::{
        FrameHeader,
        Opcode,
        header::{LENGTH_MASK, MAX_CONTROL_PAYLOAD, RSV1, RSV2, RSV3},
    },
};

/// Which arena backs a frame's payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArenaKind {
    /// Single-frame messages and control frames.
    Unfragmented,
    /// Frames belonging to a fragmented message.
    Fragmented,
}

/// What a validated header says about its frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    /// Opcode on the wire.
    pub opcode: Opcode,
    /// Opcode of the message the frame belongs to; never `Continuation`.
    pub message: Opcode,
    /// FIN bit.
    pub fin: bool,
    /// The message was sent compressed.
    pub compressed: bool,
    /// MASK bit.
    pub masked: bool,
    /// Arena backing the payload.
    pub arena: ArenaKind,
}

/// Progress of the fragmented message currently being received.
///
/// At most one fragmented message is active at a time; control frames may
/// arrive between its fragments without disturbing it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FragmentState {
    active: Option<Opcode>,
    compressed: bool,
}

impl FragmentState {
    /// Opcode of the active fragmented message, if any.
    #[must_use]
    pub const fn active(&self) -> Option<Opcode> { self.active }

    /// Check a frame header against the protocol rules and the current
    /// fragmentation state, recording the start of a fragmented message.
    ///
    /// `rsv1_allowed` is set when permessage-deflate was negotiated.
    pub fn validate(
        &mut self,
        header: &FrameHeader,
        rsv1_allowed: bool,
    ) -> Result<FrameInfo, ProtocolError> {
        let reserved = if rsv1_allowed { RSV2 | RSV3 } else { RSV1 | RSV2 | RSV3 };
        let bits = header.reserved_bits() & reserved;
        if bits != 0 {
            return Err(ProtocolError::ReservedBits { bits });
        }

        let compressed = header.rsv1;
        if header.opcode_bits == Opcode::Continuation.as_u8() {
            if compressed {
                return Err(ProtocolError::CompressedContinuation);
            }
            let message = self.active.ok_or(ProtocolError::UnexpectedContinuation)?;
            return Ok(FrameInfo {
                opcode: Opcode::Continuation,
                message,
                fin: header.fin,
                compressed: self.compressed,
                masked: header.masked,
                arena: ArenaKind::Fragmented,
            });
        }
        if header.opcode_bits < 3 && self.active.is_some() {
            return Err(ProtocolError::InterleavedDataFrame);
        }
        if header.opcode_bits >= 8 && compressed {
            return Err(ProtocolError::CompressedControlFrame);
        }

        let opcode = Opcode::try_from(header.opcode_bits)?;
        match opcode {
            Opcode::Text | Opcode::Binary => {
                let arena = if header.fin {
                    ArenaKind::Unfragmented
                } else {
                    self.active = Some(opcode);
                    self.compressed = compressed;
                    ArenaKind::Fragmented
                };
                Ok(FrameInfo {
                    opcode,
                    message: opcode,
                    fin: header.fin,
                    compressed,
                    masked: header.masked,
                    arena,
                })
            }
            Opcode::Close | Opcode::Ping | Opcode::Pong => {
                if !header.fin {
                    return Err(ProtocolError::FragmentedControlFrame {
                        opcode: opcode.as_u8(),
                    });
                }
                let marker = header.length_marker & LENGTH_MASK;
                if u64::from(marker) > MAX_CONTROL_PAYLOAD {
                    return Err(ProtocolError::ControlFrameTooLong { marker });
                }
                Ok(FrameInfo {
                    opcode,
                    message: opcode,
                    fin: true,
                    compressed: false,
                    masked: header.masked,
                    arena: ArenaKind::Unfragmented,
                })
            }
            Opcode::Continuation => Err(ProtocolError::UnexpectedContinuation),
        }
    }

    /// Record that a frame finished decoding.
    pub fn complete(&mut self, info: &FrameInfo) {
        if info.fin && !info.opcode.is_control() {
            self.active = None;
            self.compressed = false;
        }
    }
}
