//! Reconciling local options with the peer's parameters.

use std::sync::Arc;

use super::{
    DeflateConfig,
    DeflateParams,
    EXTENSION_NAME,
    Extension,
    NegotiationError,
    RequestedWindowBits,
    Role,
    WindowBits,
    WindowBitsOption,
};

/// Parameters both endpoints agreed on; fixed for the connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NegotiatedDeflate {
    /// The server resets its deflate dictionary after every message.
    pub server_no_context_takeover: bool,
    /// The client resets its deflate dictionary after every message.
    pub client_no_context_takeover: bool,
    /// Window size the server compresses with, when limited.
    pub server_max_window_bits: Option<WindowBits>,
    /// Window size the client compresses with, when limited.
    pub client_max_window_bits: Option<WindowBits>,
}

impl NegotiatedDeflate {
    /// Whether the endpoint playing `role` drops its dictionary per message.
    #[must_use]
    pub const fn no_context_takeover(&self, role: Role) -> bool {
        match role {
            Role::Server => self.server_no_context_takeover,
            Role::Client => self.client_no_context_takeover,
        }
    }

    /// Window size the endpoint playing `role` compresses with.
    #[must_use]
    pub fn window_bits(&self, role: Role) -> WindowBits {
        match role {
            Role::Server => self.server_max_window_bits,
            Role::Client => self.client_max_window_bits,
        }
        .unwrap_or(WindowBits::DEFAULT)
    }

    /// The extension entry a server returns in its handshake response.
    #[must_use]
    pub fn to_extension(&self) -> Extension {
        let mut ext = Extension::new(EXTENSION_NAME);
        if self.server_no_context_takeover {
            ext = ext.flag("server_no_context_takeover");
        }
        if self.client_no_context_takeover {
            ext = ext.flag("client_no_context_takeover");
        }
        if let Some(bits) = self.server_max_window_bits {
            ext = ext.param("server_max_window_bits", bits.get());
        }
        if let Some(bits) = self.client_max_window_bits {
            ext = ext.param("client_max_window_bits", bits.get());
        }
        ext
    }
}

/// Negotiator for one connection's permessage-deflate extension.
///
/// # Examples
///
/// ```
/// use wsframe::deflate::{DeflateConfig, PerMessageDeflate, Role, parse_extensions};
///
/// let client = PerMessageDeflate::new(DeflateConfig::default(), Role::Client);
/// let offer = client.offer().to_string();
/// assert_eq!(offer, "permessage-deflate; client_max_window_bits");
///
/// let server = PerMessageDeflate::new(DeflateConfig::default(), Role::Server);
/// let offers: Vec<_> = parse_extensions(&offer).into_iter().map(|e| e.params).collect();
/// let negotiated = server.accept(&offers)?;
/// assert!(!negotiated.server_no_context_takeover);
/// # Ok::<(), wsframe::deflate::NegotiationError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct PerMessageDeflate {
    config: DeflateConfig,
    role: Role,
}

impl PerMessageDeflate {
    /// Create a negotiator for an endpoint playing `role`.
    #[must_use]
    pub const fn new(config: DeflateConfig, role: Role) -> Self { Self { config, role } }

    /// Local options.
    #[must_use]
    pub const fn config(&self) -> &DeflateConfig { &self.config }

    /// Role this endpoint played in the handshake.
    #[must_use]
    pub const fn role(&self) -> Role { self.role }

    /// The parameter set a client offers.
    ///
    /// `client_max_window_bits` is offered bare unless local options limit
    /// or disallow it.
    #[must_use]
    pub fn offer(&self) -> Extension {
        let mut ext = Extension::new(EXTENSION_NAME);
        if self.config.server_no_context_takeover == Some(true) {
            ext = ext.flag("server_no_context_takeover");
        }
        if self.config.client_no_context_takeover == Some(true) {
            ext = ext.flag("client_no_context_takeover");
        }
        if let WindowBitsOption::Limit(bits) = self.config.server_max_window_bits {
            ext = ext.param("server_max_window_bits", bits.get());
        }
        match self.config.client_max_window_bits {
            WindowBitsOption::Limit(bits) => ext = ext.param("client_max_window_bits", bits.get()),
            WindowBitsOption::Unset => ext = ext.flag("client_max_window_bits"),
            WindowBitsOption::Disallowed => {}
        }
        ext
    }

    /// Normalise the peer's parameter sets and settle on one.
    ///
    /// A server picks the first offer compatible with local options; a
    /// client validates the single set the server accepted.
    ///
    /// # Errors
    ///
    /// Returns [`NegotiationError`] when any parameter set is malformed or
    /// no acceptable configuration exists.
    pub fn accept(
        &self,
        offers: &[Vec<(String, Option<String>)>],
    ) -> Result<Arc<NegotiatedDeflate>, NegotiationError> {
        let params = offers
            .iter()
            .map(|raw| DeflateParams::normalize(raw, self.role))
            .collect::<Result<Vec<_>, _>>()?;
        let negotiated = match self.role {
            Role::Server => self.accept_as_server(&params)?,
            Role::Client => self.accept_as_client(&params)?,
        };
        tracing::debug!(role = ?self.role, ?negotiated, "permessage-deflate negotiated");
        Ok(Arc::new(negotiated))
    }

    fn accept_as_server(&self, offers: &[DeflateParams]) -> Result<NegotiatedDeflate, NegotiationError> {
        offers
            .iter()
            .find_map(|offer| self.server_response(offer))
            .ok_or(NegotiationError::NoAcceptableOffer)
    }

    fn server_response(&self, offer: &DeflateParams) -> Option<NegotiatedDeflate> {
        let local = &self.config;
        let offered_server_bits = offer.server_max_window_bits.and_then(RequestedWindowBits::bits);
        let offered_client_bits = offer.client_max_window_bits.and_then(RequestedWindowBits::bits);

        if local.server_no_context_takeover == Some(false) && offer.server_no_context_takeover {
            return None;
        }
        match local.server_max_window_bits {
            WindowBitsOption::Disallowed if offer.server_max_window_bits.is_some() => return None,
            WindowBitsOption::Limit(limit) if offered_server_bits.is_some_and(|bits| bits != limit) => {
                return None;
            }
            _ => {}
        }
        if matches!(local.client_max_window_bits, WindowBitsOption::Limit(_))
            && offer.client_max_window_bits.is_none()
        {
            return None;
        }

        let server_max_window_bits = match local.server_max_window_bits {
            WindowBitsOption::Limit(limit) => Some(limit),
            _ => offered_server_bits,
        };
        let client_max_window_bits = match local.client_max_window_bits {
            WindowBitsOption::Limit(limit) => Some(limit),
            WindowBitsOption::Unset => offered_client_bits,
            WindowBitsOption::Disallowed => None,
        };
        Some(NegotiatedDeflate {
            server_no_context_takeover: local.server_no_context_takeover == Some(true)
                || offer.server_no_context_takeover,
            client_no_context_takeover: local.client_no_context_takeover == Some(true)
                || (local.client_no_context_takeover != Some(false)
                    && offer.client_no_context_takeover),
            server_max_window_bits,
            client_max_window_bits,
        })
    }

    fn accept_as_client(&self, response: &[DeflateParams]) -> Result<NegotiatedDeflate, NegotiationError> {
        let [accepted] = response else {
            return Err(NegotiationError::UnexpectedResponseCount {
                count: response.len(),
            });
        };
        let local = &self.config;
        let accepted_client_bits = accepted.client_max_window_bits.and_then(RequestedWindowBits::bits);
        let accepted_server_bits = accepted.server_max_window_bits.and_then(RequestedWindowBits::bits);

        if local.client_no_context_takeover == Some(false) && accepted.client_no_context_takeover {
            return Err(NegotiationError::RejectedResponse {
                key: "client_no_context_takeover",
            });
        }
        let client_bits_ok = match local.client_max_window_bits {
            WindowBitsOption::Unset => true,
            WindowBitsOption::Disallowed => accepted.client_max_window_bits.is_none(),
            WindowBitsOption::Limit(limit) => accepted_client_bits.is_some_and(|bits| bits <= limit),
        };
        if !client_bits_ok {
            return Err(NegotiationError::RejectedResponse {
                key: "client_max_window_bits",
            });
        }
        let server_bits_exceeded = match local.server_max_window_bits {
            WindowBitsOption::Limit(limit) => accepted_server_bits.is_some_and(|bits| bits > limit),
            _ => false,
        };
        if server_bits_exceeded {
            return Err(NegotiationError::RejectedResponse {
                key: "server_max_window_bits",
            });
        }

        Ok(NegotiatedDeflate {
            server_no_context_takeover: accepted.server_no_context_takeover,
            client_no_context_takeover: accepted.client_no_context_takeover,
            server_max_window_bits: accepted_server_bits,
            client_max_window_bits: accepted_client_bits,
        })
    }
}
