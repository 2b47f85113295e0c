//! Configuration and limits for a client connection.

use std::path::PathBuf;
use std::time::Duration;

/// Resource limits for a connection.
///
/// The frame accumulation buffer is unbounded unless
/// [`max_buffered_frame`](Self::max_buffered_frame) is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size of the handshake response header block in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,

    /// Maximum number of bytes buffered for a frame whose end marker has not
    /// arrived yet.
    ///
    /// Default: `None` (unbounded)
    pub max_buffered_frame: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_handshake_size: 8192,
            max_buffered_frame: None,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(max_handshake_size: usize, max_buffered_frame: Option<usize>) -> Self {
        Self {
            max_handshake_size,
            max_buffered_frame,
        }
    }

    /// Validate that handshake size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`](crate::Error::HandshakeTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<(), crate::Error> {
        if size > self.max_handshake_size {
            Err(crate::Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a pending partial frame is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`](crate::Error::FrameTooLarge) if `size` exceeds the configured maximum.
    pub const fn check_buffered_frame(&self, size: usize) -> Result<(), crate::Error> {
        match self.max_buffered_frame {
            Some(max) if size > max => Err(crate::Error::FrameTooLarge { size, max }),
            _ => Ok(()),
        }
    }
}

/// How the TLS transport validates the server certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerifyMode {
    /// Accept any certificate.
    #[default]
    None,
    /// Verify the chain against the configured CA bundle, or the bundled
    /// web PKI roots when no bundle is given.
    Required,
}

/// Client connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint URL (`ws://` or `wss://`).
    pub url: String,

    /// PEM file with trusted CA certificates for `wss://`.
    ///
    /// Default: None
    pub ca_certificates: Option<PathBuf>,

    /// Certificate verification mode for `wss://`.
    ///
    /// Default: [`VerifyMode::None`]
    pub verify_mode: VerifyMode,

    /// Extra request headers sent with the handshake.
    ///
    /// Headers named like one of the mandatory handshake headers are replaced
    /// by the mandatory value.
    pub headers: Vec<(String, String)>,

    /// Value for `Sec-WebSocket-Protocol`.
    ///
    /// Default: None
    pub subprotocol: Option<String>,

    /// Receive timeout applied to every read once the connection is open.
    ///
    /// When it elapses the handler's `on_timeout` fires and the connection
    /// stays open. `stop()` is only observed between reads, so this also
    /// bounds how long a stop request can take to be honored; with `None` a
    /// quiet connection never notices it.
    ///
    /// Default: None
    pub timeout: Option<Duration>,

    /// Maximum bytes requested per read.
    ///
    /// Default: 2048
    pub read_buffer_size: usize,

    /// Resource limits.
    pub limits: Limits,
}

impl Config {
    /// Create a configuration for `url` with default settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ca_certificates: None,
            verify_mode: VerifyMode::default(),
            headers: Vec::new(),
            subprotocol: None,
            timeout: None,
            read_buffer_size: 2048,
            limits: Limits::default(),
        }
    }

    /// Set the CA bundle used to verify the server certificate.
    #[must_use]
    pub fn with_ca_certificates(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_certificates = Some(path.into());
        self
    }

    /// Set the certificate verification mode.
    #[must_use]
    pub const fn with_verify_mode(mut self, mode: VerifyMode) -> Self {
        self.verify_mode = mode;
        self
    }

    /// Add an extra handshake header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Request a subprotocol.
    #[must_use]
    pub fn with_subprotocol(mut self, protocol: impl Into<String>) -> Self {
        self.subprotocol = Some(protocol.into());
        self
    }

    /// Set the open-loop receive timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set read buffer size.
    #[must_use]
    pub const fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set custom limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
