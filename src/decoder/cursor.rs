//! The pending-read cursor.
//!
//! The decoder always waits for an exact number of bytes: the fixed header,
//! an extended length, a mask key or a payload. An [`Expectation`] names
//! the step, where the bytes go and how many have arrived so far.

use crate::arena::ArenaSlice;

use super::state::ArenaKind;

/// Decoding step the cursor is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The two fixed header bytes.
    Header,
    /// A 2- or 8-byte extended payload length.
    ExtendedLength,
    /// The 4-byte mask key.
    MaskKey,
    /// The payload itself.
    Payload,
}

/// Destination of the bytes being read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// The header scratch area, starting at `start`.
    Scratch { start: usize },
    /// A region of one of the payload arenas.
    Arena { kind: ArenaKind, slice: ArenaSlice },
}

/// Bytes the decoder needs before it can take its next step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Expectation {
    pub step: Step,
    pub target: Target,
    pub len: usize,
    pub filled: usize,
}

impl Expectation {
    /// Wait for the fixed header of the next frame.
    pub const fn header() -> Self {
        Self {
            step: Step::Header,
            target: Target::Scratch { start: 0 },
            len: 2,
            filled: 0,
        }
    }

    pub const fn new(step: Step, target: Target, len: usize) -> Self {
        Self {
            step,
            target,
            len,
            filled: 0,
        }
    }

    pub const fn remaining(&self) -> usize { self.len - self.filled }

    pub const fn is_satisfied(&self) -> bool { self.filled == self.len }
}
