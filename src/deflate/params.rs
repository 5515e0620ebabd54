//! `Sec-WebSocket-Extensions` header values and permessage-deflate
//! parameter normalisation.

use std::fmt;

use super::{NegotiationError, Role, WindowBits};

/// Registered extension token for permessage-deflate.
pub const EXTENSION_NAME: &str = "permessage-deflate";

/// One extension entry: a token followed by `key[=value]` parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extension {
    /// Extension token, e.g. `permessage-deflate`.
    pub name: String,
    /// Parameters in header order; bare keys carry `None`.
    pub params: Vec<(String, Option<String>)>,
}

impl Extension {
    /// Create an extension entry with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a bare parameter.
    #[must_use]
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.params.push((key.into(), None));
        self
    }

    /// Append a parameter with a value.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), Some(value.to_string())));
        self
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (key, value) in &self.params {
            match value {
                Some(value) => write!(f, "; {key}={value}")?,
                None => write!(f, "; {key}")?,
            }
        }
        Ok(())
    }
}

/// Parse a `Sec-WebSocket-Extensions` header value.
///
/// Entries are comma-separated and parameters semicolon-separated. Quotes
/// around values are removed and an empty value counts as a bare key.
///
/// # Examples
///
/// ```
/// use wsframe::deflate::parse_extensions;
///
/// let parsed = parse_extensions("permessage-deflate; client_max_window_bits=\"10\", foo");
/// assert_eq!(parsed.len(), 2);
/// assert_eq!(parsed[0].name, "permessage-deflate");
/// assert_eq!(
///     parsed[0].params,
///     vec![("client_max_window_bits".to_owned(), Some("10".to_owned()))]
/// );
/// assert_eq!(parsed[1].name, "foo");
/// ```
#[must_use]
pub fn parse_extensions(header: &str) -> Vec<Extension> {
    header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let name = parts.next().map(str::trim).filter(|name| !name.is_empty())?;
            let params = parts
                .map(|param| {
                    let mut kv = param.trim().splitn(2, '=');
                    let key = kv.next().unwrap_or_default().trim().to_owned();
                    let value = kv
                        .next()
                        .map(|value| value.trim().replace('"', ""))
                        .filter(|value| !value.is_empty());
                    (key, value)
                })
                .collect();
            Some(Extension {
                name: name.to_owned(),
                params,
            })
        })
        .collect()
}

/// Format extension entries into a header value.
#[must_use]
pub fn format_extensions(extensions: &[Extension]) -> String {
    extensions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Offered `*_max_window_bits` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestedWindowBits {
    /// Bare flag: the other side may choose.
    Any,
    /// Explicit window size.
    Bits(WindowBits),
}

impl RequestedWindowBits {
    /// The explicit window size, if one was given.
    #[must_use]
    pub const fn bits(self) -> Option<WindowBits> {
        match self {
            Self::Any => None,
            Self::Bits(bits) => Some(bits),
        }
    }
}

/// Validated permessage-deflate parameters from one offer or response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeflateParams {
    /// `server_no_context_takeover` was present.
    pub server_no_context_takeover: bool,
    /// `client_no_context_takeover` was present.
    pub client_no_context_takeover: bool,
    /// `server_max_window_bits`, if present.
    pub server_max_window_bits: Option<RequestedWindowBits>,
    /// `client_max_window_bits`, if present.
    pub client_max_window_bits: Option<RequestedWindowBits>,
}

impl DeflateParams {
    /// Validate raw parameters received by an endpoint playing `role`.
    ///
    /// Bare window-bits flags are only meaningful in a client's offer, so
    /// they are rejected when `role` is [`Role::Client`].
    ///
    /// # Errors
    ///
    /// Returns a [`NegotiationError`] for duplicate or unknown keys, values
    /// on context-takeover flags, window bits outside 8..=15, and bare
    /// window bits in a server response.
    pub fn normalize(
        raw: &[(String, Option<String>)],
        role: Role,
    ) -> Result<Self, NegotiationError> {
        let mut params = Self::default();
        let mut seen: Vec<&str> = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            if seen.contains(&key.as_str()) {
                return Err(NegotiationError::DuplicateParameter { key: key.clone() });
            }
            seen.push(key);
            match key.as_str() {
                "server_no_context_takeover" => {
                    params.server_no_context_takeover = parse_flag(key, value.as_deref())?;
                }
                "client_no_context_takeover" => {
                    params.client_no_context_takeover = parse_flag(key, value.as_deref())?;
                }
                "server_max_window_bits" => {
                    params.server_max_window_bits =
                        Some(parse_window_bits(key, value.as_deref(), role)?);
                }
                "client_max_window_bits" => {
                    params.client_max_window_bits =
                        Some(parse_window_bits(key, value.as_deref(), role)?);
                }
                _ => return Err(NegotiationError::UnknownParameter { key: key.clone() }),
            }
        }
        Ok(params)
    }
}

fn parse_flag(key: &str, value: Option<&str>) -> Result<bool, NegotiationError> {
    match value {
        None => Ok(true),
        Some(value) => Err(NegotiationError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}

fn parse_window_bits(
    key: &str,
    value: Option<&str>,
    role: Role,
) -> Result<RequestedWindowBits, NegotiationError> {
    let Some(value) = value else {
        return match role {
            Role::Server => Ok(RequestedWindowBits::Any),
            Role::Client => Err(NegotiationError::MissingValue {
                key: key.to_owned(),
            }),
        };
    };
    let invalid = || NegotiationError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    };
    let bits = value.parse::<u8>().map_err(|_| invalid())?;
    WindowBits::new(bits)
        .map(RequestedWindowBits::Bits)
        .map_err(|_| invalid())
}
