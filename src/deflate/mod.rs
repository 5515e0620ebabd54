//! The permessage-deflate extension (RFC 7692).
//!
//! Negotiation runs once during the opening handshake: a client sends
//! [`PerMessageDeflate::offer`], the server picks a compatible offer with
//! [`PerMessageDeflate::accept`], and the client validates the server's
//! choice with the same method. The result is an immutable
//! [`NegotiatedDeflate`] shared by the connection's [`Compressor`] and
//! [`Decompressor`].

pub mod codec;
pub mod config;
pub mod error;
pub mod negotiate;
pub mod params;

pub use codec::{BLOCKING_THRESHOLD, Compressor, DEFLATE_TRAILER, Decompressor};
pub use config::{DeflateConfig, Role, WindowBits, WindowBitsOption};
pub use error::{DeflateError, NegotiationError};
pub use negotiate::{NegotiatedDeflate, PerMessageDeflate};
pub use params::{
    DeflateParams,
    EXTENSION_NAME,
    Extension,
    RequestedWindowBits,
    format_extensions,
    parse_extensions,
};

#[cfg(test)]
mod tests;
