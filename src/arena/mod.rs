//! Reusable payload storage for the frame decoder.
//!
//! [`BufferArena`] owns one backing buffer and hands out disjoint
//! [`ArenaSlice`] handles into it, so inbound payloads are written without an
//! allocation per frame. Handles are index/length pairs stamped with the
//! arena generation: [`BufferArena::reclaim`] and any growth start a new
//! generation, after which older handles resolve to
//! [`ArenaError::StaleSlice`] instead of aliasing reused memory.
//!
//! Sizing is delegated to a [`SizingPolicy`]. The default
//! [`AdaptiveSizing`] grows to "used so far plus the request" and shrinks
//! towards the running average of bytes used per cycle, but only after
//! [`SHRINK_HYSTERESIS`] consecutive cycles below the current size.

use std::fmt;

use thiserror::Error;

/// Consecutive below-target reclaim cycles that trigger a shrink.
pub const SHRINK_HYSTERESIS: u32 = 2;

/// Errors raised when resolving an [`ArenaSlice`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ArenaError {
    /// The handle was issued before the most recent reclaim or growth.
    #[error("arena slice from generation {issued} used in generation {current}")]
    StaleSlice {
        /// Generation the handle was issued in.
        issued: u64,
        /// Current arena generation.
        current: u64,
    },
}

/// Strategy deciding how large the backing buffer should be.
pub trait SizingPolicy: Send {
    /// Size of the replacement buffer when `requested` bytes do not fit.
    ///
    /// `used` counts the bytes handed out since the last reclaim.
    fn grow(&mut self, used: usize, requested: usize) -> usize;

    /// Target size observed at a reclaim after `used` bytes were handed out.
    fn shrink(&mut self, used: usize) -> usize;
}

/// Default sizing: grow once per burst, shrink towards average usage.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdaptiveSizing {
    previous_used: Option<usize>,
}

impl SizingPolicy for AdaptiveSizing {
    fn grow(&mut self, used: usize, requested: usize) -> usize { used.saturating_add(requested) }

    fn shrink(&mut self, used: usize) -> usize {
        let target = match self.previous_used {
            Some(previous) => previous.midpoint(used),
            None => used,
        };
        self.previous_used = Some(used);
        target
    }
}

/// Handle to a region of a [`BufferArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaSlice {
    generation: u64,
    offset: usize,
    len: usize,
}

impl ArenaSlice {
    /// Length of the region in bytes.
    #[must_use]
    pub const fn len(&self) -> usize { self.len }

    /// Whether the region is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.len == 0 }

    /// Generation the handle belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 { self.generation }
}

/// Reusable backing buffer handing out generation-checked slices.
///
/// # Examples
///
/// ```
/// use wsframe::arena::{ArenaError, BufferArena};
///
/// let mut arena = BufferArena::with_default_policy(16);
/// let slice = arena.acquire(4);
/// arena.get_mut(&slice)?.copy_from_slice(b"ping");
/// assert_eq!(arena.get(&slice)?, b"ping");
///
/// arena.reclaim(false);
/// assert!(matches!(arena.get(&slice), Err(ArenaError::StaleSlice { .. })));
/// # Ok::<(), ArenaError>(())
/// ```
pub struct BufferArena {
    backing: Option<Vec<u8>>,
    offset: usize,
    used: usize,
    change_factor: u32,
    generation: u64,
    policy: Box<dyn SizingPolicy>,
}

impl BufferArena {
    /// Create an arena with an initial backing size and sizing policy.
    #[must_use]
    pub fn new(initial_size: usize, policy: impl SizingPolicy + 'static) -> Self {
        Self {
            backing: (initial_size > 0).then(|| vec![0; initial_size]),
            offset: 0,
            used: 0,
            change_factor: 0,
            generation: 0,
            policy: Box::new(policy),
        }
    }

    /// Create an arena using [`AdaptiveSizing`].
    #[must_use]
    pub fn with_default_policy(initial_size: usize) -> Self {
        Self::new(initial_size, AdaptiveSizing::default())
    }

    /// Current backing buffer size in bytes.
    #[must_use]
    pub fn size(&self) -> usize { self.backing.as_ref().map_or(0, Vec::len) }

    /// Bytes handed out since the last reclaim.
    #[must_use]
    pub fn used(&self) -> usize { self.used }

    /// Current generation; handles from other generations are stale.
    #[must_use]
    pub fn generation(&self) -> u64 { self.generation }

    /// Reserve `len` bytes and return a handle to them.
    ///
    /// When the request does not fit in the remaining space the backing
    /// buffer is replaced with one sized by the policy, which invalidates
    /// every handle issued before.
    pub fn acquire(&mut self, len: usize) -> ArenaSlice {
        let fits = self
            .offset
            .checked_add(len)
            .is_some_and(|end| end <= self.size());
        if !fits {
            let size = self.policy.grow(self.used, len).max(len);
            self.backing = Some(vec![0; size]);
            self.offset = 0;
            self.generation += 1;
        }
        let slice = ArenaSlice {
            generation: self.generation,
            offset: self.offset,
            len,
        };
        self.offset += len;
        self.used = self.used.saturating_add(len);
        slice
    }

    /// Borrow the bytes behind `slice`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::StaleSlice`] if the handle predates the current
    /// generation.
    pub fn get(&self, slice: &ArenaSlice) -> Result<&[u8], ArenaError> {
        self.check(slice)?;
        Ok(self
            .backing
            .as_deref()
            .map_or(&[][..], |buf| &buf[slice.offset..slice.offset + slice.len]))
    }

    /// Mutably borrow the bytes behind `slice`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::StaleSlice`] if the handle predates the current
    /// generation.
    pub fn get_mut(&mut self, slice: &ArenaSlice) -> Result<&mut [u8], ArenaError> {
        self.check(slice)?;
        Ok(self
            .backing
            .as_deref_mut()
            .map_or(&mut [][..], |buf| {
                &mut buf[slice.offset..slice.offset + slice.len]
            }))
    }

    /// Reset the cursor, starting a new generation.
    ///
    /// The policy's shrink target is compared with the current size; the
    /// backing buffer is replaced with one of the target size when `force`
    /// is set or after [`SHRINK_HYSTERESIS`] consecutive cycles below it.
    pub fn reclaim(&mut self, force: bool) {
        let target = self.policy.shrink(self.used);
        let size = self.size();
        if target < size {
            self.change_factor += 1;
        } else {
            self.change_factor = 0;
        }
        if (force || self.change_factor >= SHRINK_HYSTERESIS) && target != size {
            tracing::trace!(from = size, to = target, "resizing arena backing buffer");
            self.change_factor = 0;
            self.backing = (target > 0).then(|| vec![0; target]);
        }
        self.offset = 0;
        self.used = 0;
        self.generation += 1;
    }

    fn check(&self, slice: &ArenaSlice) -> Result<(), ArenaError> {
        if slice.generation == self.generation {
            Ok(())
        } else {
            Err(ArenaError::StaleSlice {
                issued: slice.generation,
                current: self.generation,
            })
        }
    }
}

impl fmt::Debug for BufferArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferArena")
            .field("size", &self.size())
            .field("offset", &self.offset)
            .field("used", &self.used)
            .field("change_factor", &self.change_factor)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
