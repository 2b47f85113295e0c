//! Endpoint resolution from a `ws://` / `wss://` URL.

use url::{Host, Url};

use crate::error::{Error, Result};

/// URL scheme, which decides between plaintext and TLS transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plaintext TCP.
    Ws,
    /// TCP wrapped in TLS.
    Wss,
}

impl Scheme {
    /// Port used when the URL does not name one.
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Scheme::Ws => 80,
            Scheme::Wss => 443,
        }
    }

    /// Check if this scheme requires TLS.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        matches!(self, Scheme::Wss)
    }

    /// HTTP scheme used for the `Origin` header.
    #[must_use]
    pub const fn origin_scheme(&self) -> &'static str {
        match self {
            Scheme::Ws => "http",
            Scheme::Wss => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scheme::Ws => write!(f, "ws"),
            Scheme::Wss => write!(f, "wss"),
        }
    }
}

/// A resolved connection target. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Transport scheme.
    pub scheme: Scheme,
    /// Host as written in the URL (IPv6 literals keep their brackets).
    pub host: String,
    /// TCP port, defaulted from the scheme when absent.
    pub port: u16,
    /// Request path, never empty.
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
    /// `Origin` header value.
    pub origin: String,
    authority: String,
}

impl Endpoint {
    /// Resolve `url` into an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the URL does not parse, has no host,
    /// or uses a scheme other than `ws` / `wss`.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;

        let scheme = match parsed.scheme() {
            "ws" => Scheme::Ws,
            "wss" => Scheme::Wss,
            other => {
                return Err(Error::InvalidUrl(format!(
                    "unsupported scheme {other:?} (expected ws or wss)"
                )));
            }
        };

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidUrl(format!("missing host in {url}")))?
            .to_string();

        // `Url::port` is None for the scheme's default port as well.
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        };
        let port = parsed.port().unwrap_or_else(|| scheme.default_port());

        let path = match parsed.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(Self {
            scheme,
            origin: format!("{}://{}", scheme.origin_scheme(), authority),
            host,
            port,
            path,
            query: parsed.query().map(str::to_string),
            authority,
        })
    }

    /// `Host` header value: the host plus the port when it was explicit.
    #[must_use]
    pub fn host_header(&self) -> &str {
        &self.authority
    }

    /// Request target: path plus `?query` when present.
    #[must_use]
    pub fn resource(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    /// Host name to dial and to present as TLS server name.
    #[must_use]
    pub fn connect_host(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host)
    }

    /// Check if the host is an IP literal rather than a DNS name.
    #[must_use]
    pub fn is_ip_literal(&self) -> bool {
        matches!(
            Host::parse(&self.host),
            Ok(Host::Ipv4(_)) | Ok(Host::Ipv6(_))
        )
    }
}
