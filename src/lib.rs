#![doc(html_root_url = "https://docs.rs/wsframe/latest")]
//! Public API for the `wsframe` library.
//!
//! This crate implements the WebSocket (RFC 6455) frame engine: an
//! incremental decoder that turns arbitrary chunks of inbound bytes into
//! validated, reassembled messages, an encoder that frames outbound
//! messages, the buffer arenas both rely on, and the permessage-deflate
//! extension (RFC 7692). The HTTP upgrade and socket management are left to
//! the caller.

pub mod arena;
pub mod close;
pub mod decoder;
pub mod deflate;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod handler;
pub mod metrics;
pub mod receiver;
pub mod sender;
pub mod validation;

pub use arena::{ArenaError, ArenaSlice, BufferArena};
pub use decoder::{CompletedFrame, DecoderConfig, FrameDecoder};
pub use deflate::{
    Compressor,
    DeflateConfig,
    Decompressor,
    NegotiatedDeflate,
    PerMessageDeflate,
    Role,
    WindowBits,
};
pub use encoder::{EncodedFrame, FrameEncoder, FrameOptions};
pub use error::{DecodeError, ProtocolError, WsError};
pub use frame::Opcode;
pub use handler::{MessageFlags, MessageHandler};
pub use metrics::Direction;
pub use receiver::{Receiver, ReceiverConfig};
pub use sender::{OutboundHandle, OutboundQueue, SendError, SendOptions, Sender};
