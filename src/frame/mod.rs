//! Wire-level building blocks of a WebSocket frame.
//!
//! ```text
//!  0                   1                   2                   3
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |            (16/64)            |
//! |N|V|V|V|       |S|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               | Masking-key, if MASK set      |
//! +-------------------------------+-------------------------------+
//! ```

pub mod header;
pub mod mask;
pub mod opcode;

pub use header::{FrameHeader, header_len, parse_extended_length, write_header};
pub use mask::{apply_mask, mask_into};
pub use opcode::Opcode;

#[cfg(test)]
mod tests;
