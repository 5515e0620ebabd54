//! Per-direction streaming deflate and inflate.
//!
//! Each direction owns at most one `flate2` stream. It is created on first
//! use and, when the negotiated parameters disable context takeover for
//! that direction, dropped after every final fragment so the next message
//! starts from an empty dictionary. A stream that failed is always dropped.
//!
//! Payloads of at least [`BLOCKING_THRESHOLD`] bytes are processed on the
//! blocking pool so a large message does not stall the runtime worker.

use std::sync::Arc;

use bytes::Bytes;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use tracing::trace;

use super::{DeflateError, NegotiatedDeflate, Role, WindowBits};

/// Sync-flush marker terminating every compressed message on the wire.
pub const DEFLATE_TRAILER: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

/// Payload size from which codec work moves to the blocking pool.
pub const BLOCKING_THRESHOLD: usize = 64 * 1024;

const OUTPUT_CHUNK: usize = 4096;

// Raw deflate streams cannot use an 8-bit window; zlib upgrades it to 9.
fn stream_window_bits(bits: WindowBits) -> u8 { bits.get().max(9) }

#[expect(
    clippy::cast_possible_truncation,
    reason = "per-call byte counts are bounded by the input slice length"
)]
fn delta(after: u64, before: u64) -> usize { (after - before) as usize }

fn deflate_sync(stream: &mut Compress, input: &[u8]) -> Result<Vec<u8>, DeflateError> {
    let mut out = Vec::with_capacity(input.len() / 2 + OUTPUT_CHUNK);
    let mut consumed = 0;
    loop {
        if out.capacity() - out.len() < OUTPUT_CHUNK {
            out.reserve(OUTPUT_CHUNK.max(out.len()));
        }
        let before = stream.total_in();
        stream.compress_vec(&input[consumed..], &mut out, FlushCompress::Sync)?;
        consumed += delta(stream.total_in(), before);
        if consumed == input.len() && out.len() < out.capacity() {
            return Ok(out);
        }
    }
}

fn new_inflate(bits: u8) -> Decompress { Decompress::new_with_window_bits(false, bits) }

// A block with BFINAL set ends the raw stream. The peer starts its next
// message from a fresh stream, so inflation restarts too; the appended
// trailer that follows such a block carries nothing.
fn inflate_sync(stream: &mut Decompress, bits: u8, input: &[u8]) -> Result<Vec<u8>, DeflateError> {
    let mut out = Vec::with_capacity(input.len().saturating_mul(2).max(OUTPUT_CHUNK));
    let mut consumed = 0;
    loop {
        if out.capacity() - out.len() < OUTPUT_CHUNK {
            out.reserve(OUTPUT_CHUNK.max(out.len()));
        }
        let before_in = stream.total_in();
        let before_out = stream.total_out();
        let status = stream.decompress_vec(&input[consumed..], &mut out, FlushDecompress::Sync)?;
        consumed += delta(stream.total_in(), before_in);
        let produced = delta(stream.total_out(), before_out);
        if status == Status::StreamEnd {
            trace!(remaining = input.len() - consumed, "inflate stream ended");
            *stream = new_inflate(bits);
            let rest = &input[consumed..];
            if rest.is_empty() || rest == DEFLATE_TRAILER {
                return Ok(out);
            }
            continue;
        }
        let drained = consumed == input.len() && out.len() < out.capacity();
        let stalled = produced == 0 && status == Status::BufError;
        if drained || stalled {
            return Ok(out);
        }
    }
}

/// Outbound half of the extension: compresses data frame payloads.
#[derive(Debug)]
pub struct Compressor {
    params: Arc<NegotiatedDeflate>,
    role: Role,
    level: Compression,
    stream: Option<Compress>,
}

impl Compressor {
    /// Create a compressor for the endpoint playing `role`.
    #[must_use]
    pub fn new(params: Arc<NegotiatedDeflate>, role: Role, level: Compression) -> Self {
        Self {
            params,
            role,
            level,
            stream: None,
        }
    }

    /// Whether a deflate stream is currently held.
    #[must_use]
    pub fn has_stream(&self) -> bool { self.stream.is_some() }

    #[cfg(test)]
    pub(crate) fn with_stream(mut self, stream: Compress) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Compress one fragment's payload.
    ///
    /// All output is flushed before returning. On a final fragment the
    /// trailing [`DEFLATE_TRAILER`] is removed.
    ///
    /// # Errors
    ///
    /// Returns [`DeflateError`] if the stream fails; the stream is discarded.
    pub async fn compress(&mut self, data: Bytes, fin: bool) -> Result<Bytes, DeflateError> {
        let mut stream = self.stream.take().unwrap_or_else(|| {
            let bits = stream_window_bits(self.params.window_bits(self.role));
            trace!(role = ?self.role, bits, "creating deflate stream");
            Compress::new_with_window_bits(self.level, false, bits)
        });
        let result = if data.len() >= BLOCKING_THRESHOLD {
            let (returned, result) = tokio::task::spawn_blocking(move || {
                let result = deflate_sync(&mut stream, &data);
                (stream, result)
            })
            .await?;
            stream = returned;
            result
        } else {
            deflate_sync(&mut stream, &data)
        };
        let mut out = result?;

        if fin {
            if out.ends_with(&DEFLATE_TRAILER) {
                out.truncate(out.len() - DEFLATE_TRAILER.len());
            }
            if out.is_empty() {
                out.push(0x00);
            }
        }
        if !(fin && self.params.no_context_takeover(self.role)) {
            self.stream = Some(stream);
        }
        Ok(Bytes::from(out))
    }
}

/// Inbound half of the extension: inflates compressed message payloads.
#[derive(Debug)]
pub struct Decompressor {
    params: Arc<NegotiatedDeflate>,
    role: Role,
    stream: Option<Decompress>,
}

impl Decompressor {
    /// Create a decompressor for the endpoint playing `role`.
    ///
    /// The stream is sized from the peer's negotiated window.
    #[must_use]
    pub fn new(params: Arc<NegotiatedDeflate>, role: Role) -> Self {
        Self {
            params,
            role,
            stream: None,
        }
    }

    /// Whether an inflate stream is currently held.
    #[must_use]
    pub fn has_stream(&self) -> bool { self.stream.is_some() }

    /// Inflate one fragment's payload.
    ///
    /// On a final fragment the implicit [`DEFLATE_TRAILER`] is fed first. A
    /// peer may close a message with a final deflate block; the stream is
    /// then restarted for whatever follows.
    ///
    /// # Errors
    ///
    /// Returns [`DeflateError::Decompress`] for malformed input; the stream
    /// is discarded.
    pub async fn decompress(&mut self, data: &[u8], fin: bool) -> Result<Bytes, DeflateError> {
        let peer = self.role.peer();
        let bits = stream_window_bits(self.params.window_bits(peer));
        let mut stream = self.stream.take().unwrap_or_else(|| {
            trace!(role = ?self.role, bits, "creating inflate stream");
            new_inflate(bits)
        });
        let mut input = Vec::with_capacity(data.len() + DEFLATE_TRAILER.len());
        input.extend_from_slice(data);
        if fin {
            input.extend_from_slice(&DEFLATE_TRAILER);
        }
        let result = if input.len() >= BLOCKING_THRESHOLD {
            let (returned, result) = tokio::task::spawn_blocking(move || {
                let result = inflate_sync(&mut stream, bits, &input);
                (stream, result)
            })
            .await?;
            stream = returned;
            result
        } else {
            inflate_sync(&mut stream, bits, &input)
        };
        let out = result?;

        if !(fin && self.params.no_context_takeover(peer)) {
            self.stream = Some(stream);
        }
        Ok(Bytes::from(out))
    }
}
