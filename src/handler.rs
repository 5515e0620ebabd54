//! Callbacks receiving decoded messages.
//!
//! [`MessageHandler`] is the inbound boundary of the engine: the
//! [`Receiver`](crate::receiver::Receiver) awaits each callback before it
//! decodes the next frame, so callbacks observe messages in wire order and
//! may apply backpressure simply by not returning.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::DecodeError;

/// Details accompanying a delivered message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageFlags {
    /// The frames carrying the message were masked on the wire.
    pub masked: bool,
    /// The payload is binary rather than text.
    pub binary: bool,
}

/// Receives messages decoded from the inbound byte stream.
///
/// Every method has a no-op default so implementations override only what
/// they need.
///
/// ```
/// use async_trait::async_trait;
/// use wsframe::handler::{MessageFlags, MessageHandler};
///
/// struct Echo(Vec<String>);
///
/// #[async_trait]
/// impl MessageHandler for Echo {
///     async fn on_text(&mut self, text: String, _flags: MessageFlags) { self.0.push(text); }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send {
    /// A complete, UTF-8 validated text message.
    async fn on_text(&mut self, _text: String, _flags: MessageFlags) {}

    /// A complete binary message.
    async fn on_binary(&mut self, _data: Bytes, _flags: MessageFlags) {}

    /// A ping; the owner is expected to answer with a pong.
    async fn on_ping(&mut self, _data: Bytes, _flags: MessageFlags) {}

    /// A pong.
    async fn on_pong(&mut self, _data: Bytes, _flags: MessageFlags) {}

    /// The peer started the closing handshake.
    ///
    /// A close frame without a payload is reported as code 1000 with an
    /// empty reason.
    async fn on_close(&mut self, _code: u16, _reason: String, _flags: MessageFlags) {}

    /// The inbound stream failed; close the connection with
    /// [`DecodeError::close_code`]. Called once per failure.
    async fn on_error(&mut self, _error: &DecodeError) {}
}
