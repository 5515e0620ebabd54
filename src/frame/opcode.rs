//! Frame opcodes.

use crate::error::ProtocolError;

/// Frame opcode (low nibble of the first header byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Continuation of a fragmented text or binary message.
    Continuation = 0x0,
    /// UTF-8 text data.
    Text = 0x1,
    /// Binary data.
    Binary = 0x2,
    /// Connection close.
    Close = 0x8,
    /// Ping.
    Ping = 0x9,
    /// Pong.
    Pong = 0xA,
}

impl Opcode {
    /// Whether this is a control opcode (close, ping, pong).
    #[must_use]
    pub const fn is_control(self) -> bool { self as u8 >= 0x8 }

    /// Whether this opcode starts a text or binary message.
    #[must_use]
    pub const fn is_message_start(self) -> bool { matches!(self, Self::Text | Self::Binary) }

    /// The opcode's wire value.
    #[must_use]
    pub const fn as_u8(self) -> u8 { self as u8 }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            opcode => Err(ProtocolError::UnknownOpcode { opcode }),
        }
    }
}
