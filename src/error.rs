//! Error types for the legacy WebSocket client.
//!
//! Every failure the connection worker can hit is one of these variants and is
//! reported through [`Handler::on_error`](crate::Handler::on_error) before the
//! worker ends. Read timeouts and end of stream are not errors; see
//! [`Received`](crate::transport::Received).

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while connecting, negotiating or exchanging frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// URL could not be resolved into a usable endpoint.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// DNS, TCP connect or TLS handshake failure.
    #[error("Connect error: {0}")]
    Connect(String),

    /// Server response did not match the expected upgrade response.
    #[error("Handshake mismatch on {field}: found {}", .found.as_deref().unwrap_or("nothing"))]
    Handshake {
        /// Offending part of the response (`status-line`, `connection`, ...).
        field: String,
        /// Observed value, `None` if the field was missing.
        found: Option<String>,
    },

    /// Handshake response exceeded the configured maximum before completing.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Header value would break the request framing.
    #[error("Invalid value for header {header}: {reason}")]
    InvalidHeaderValue {
        /// Header name.
        header: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Frame did not begin with the start marker.
    #[error("Framing error: {0}")]
    Framing(String),

    /// Incomplete frame grew past the configured maximum.
    #[error("Frame too large: {size} bytes buffered (max: {max})")]
    FrameTooLarge {
        /// Bytes buffered without an end marker.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Invalid UTF-8 in a frame payload.
    #[error("Invalid UTF-8 in frame payload")]
    InvalidUtf8,

    /// Read or write failure on an established connection.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operation requires an open connection.
    #[error("Connection not open (state: {0})")]
    NotOpen(crate::ConnectionState),

    /// `start` was called more than once.
    #[error("Client already started")]
    AlreadyStarted,

    /// `start` was called outside a tokio runtime.
    #[error("No tokio runtime available to run the connection")]
    NoRuntime,

    /// The worker task panicked or was cancelled.
    #[error("Connection worker ended abnormally: {0}")]
    Worker(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Build a handshake mismatch for `field`.
    pub(crate) fn handshake(field: &str, found: Option<&str>) -> Self {
        Error::Handshake {
            field: field.to_string(),
            found: found.map(str::to_string),
        }
    }
}
