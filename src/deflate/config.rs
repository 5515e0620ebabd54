//! Local permessage-deflate options.

use flate2::Compression;

use super::NegotiationError;

/// Smallest LZ77 window size the extension allows.
pub const MIN_WINDOW_BITS: u8 = 8;
/// Largest, and default, LZ77 window size.
pub const MAX_WINDOW_BITS: u8 = 15;

/// Base-two logarithm of an LZ77 sliding window size, within 8..=15.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowBits(u8);

impl WindowBits {
    /// The default 32 KiB window.
    pub const DEFAULT: Self = Self(MAX_WINDOW_BITS);

    /// Validate a window size.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError::WindowBitsOutOfRange`] outside 8..=15.
    pub const fn new(bits: u8) -> Result<Self, NegotiationError> {
        if bits < MIN_WINDOW_BITS || bits > MAX_WINDOW_BITS {
            return Err(NegotiationError::WindowBitsOutOfRange { bits });
        }
        Ok(Self(bits))
    }

    /// The raw bit count.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }
}

impl TryFrom<u8> for WindowBits {
    type Error = NegotiationError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> { Self::new(bits) }
}

/// Local preference for one direction's `*_max_window_bits` parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WindowBitsOption {
    /// No preference; the peer's value is taken when offered.
    #[default]
    Unset,
    /// The parameter must not be negotiated at all.
    Disallowed,
    /// Negotiate this window size.
    Limit(WindowBits),
}

/// Which side of the opening handshake this endpoint played.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Accepted the connection; answers offers.
    Server,
    /// Initiated the connection; sends the offer.
    Client,
}

impl Role {
    /// The other endpoint's role.
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            Self::Server => Self::Client,
            Self::Client => Self::Server,
        }
    }
}

/// Locally configured permessage-deflate options.
///
/// `Option<bool>` context-takeover fields distinguish "no preference"
/// (`None`) from an explicit demand (`Some(true)`) or refusal
/// (`Some(false)`).
///
/// # Examples
///
/// ```
/// use wsframe::deflate::{DeflateConfig, WindowBits, WindowBitsOption};
///
/// let config = DeflateConfig::default()
///     .server_no_context_takeover(true)
///     .client_max_window_bits(WindowBitsOption::Limit(WindowBits::new(10)?));
/// assert_eq!(config.server_no_context_takeover, Some(true));
/// # Ok::<(), wsframe::deflate::NegotiationError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct DeflateConfig {
    /// Preference for `server_no_context_takeover`.
    pub server_no_context_takeover: Option<bool>,
    /// Preference for `client_no_context_takeover`.
    pub client_no_context_takeover: Option<bool>,
    /// Preference for `server_max_window_bits`.
    pub server_max_window_bits: WindowBitsOption,
    /// Preference for `client_max_window_bits`.
    pub client_max_window_bits: WindowBitsOption,
    /// Compression level for outbound messages.
    pub compression: Compression,
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            server_no_context_takeover: None,
            client_no_context_takeover: None,
            server_max_window_bits: WindowBitsOption::Unset,
            client_max_window_bits: WindowBitsOption::Unset,
            compression: Compression::default(),
        }
    }
}

impl DeflateConfig {
    /// Set the `server_no_context_takeover` preference.
    #[must_use]
    pub fn server_no_context_takeover(mut self, value: bool) -> Self {
        self.server_no_context_takeover = Some(value);
        self
    }

    /// Set the `client_no_context_takeover` preference.
    #[must_use]
    pub fn client_no_context_takeover(mut self, value: bool) -> Self {
        self.client_no_context_takeover = Some(value);
        self
    }

    /// Set the `server_max_window_bits` preference.
    #[must_use]
    pub fn server_max_window_bits(mut self, value: WindowBitsOption) -> Self {
        self.server_max_window_bits = value;
        self
    }

    /// Set the `client_max_window_bits` preference.
    #[must_use]
    pub fn client_max_window_bits(mut self, value: WindowBitsOption) -> Self {
        self.client_max_window_bits = value;
        self
    }

    /// Set the outbound compression level.
    #[must_use]
    pub fn compression(mut self, level: Compression) -> Self {
        self.compression = level;
        self
    }
}
