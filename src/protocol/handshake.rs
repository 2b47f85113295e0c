//! Draft-protocol upgrade handshake.
//!
//! The client sends a fixed-format `GET` upgrade request and requires the
//! server to answer with an exact status line and exact `Connection` /
//! `Upgrade` values. There is no key/accept exchange and no version
//! negotiation.

use std::collections::HashMap;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Limits;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};

/// Status line the server must send, byte for byte.
pub const EXPECTED_STATUS_LINE: &str = "HTTP/1.1 101 Web Socket Protocol Handshake";

/// Blank line ending the HTTP header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

const MANDATORY_HEADERS: [&str; 4] = ["upgrade", "connection", "host", "origin"];

/// Parse HTTP header lines into a map keyed by lowercase name.
///
/// Values are trimmed. A repeated header keeps its last value.
fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    headers
}

/// Validate that a header value does not contain CR or LF characters.
///
/// # Errors
/// Returns `Error::InvalidHeaderValue` if the value contains `\r` or `\n`.
fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHeaderValue {
            header: header_name.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}

/// Position of the first header terminator in `buf`, if any.
#[must_use]
pub fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}

/// Upgrade request sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Request target (path plus optional query).
    pub resource: String,
    /// Headers in the order they are written.
    pub headers: Vec<(String, String)>,
}

impl HandshakeRequest {
    /// Build the request for `endpoint`.
    ///
    /// `Upgrade`, `Connection`, `Host` and `Origin` always come first, then
    /// `Sec-WebSocket-Protocol` when `protocol` is given, then the caller's
    /// `extra` headers minus any that share a name (case-insensitively) with
    /// one of those.
    pub fn new(endpoint: &Endpoint, extra: &[(String, String)], protocol: Option<&str>) -> Self {
        let mut headers = vec![
            ("Upgrade".to_string(), "WebSocket".to_string()),
            ("Connection".to_string(), "Upgrade".to_string()),
            ("Host".to_string(), endpoint.host_header().to_string()),
            ("Origin".to_string(), endpoint.origin.clone()),
        ];

        if let Some(protocol) = protocol {
            headers.push(("Sec-WebSocket-Protocol".to_string(), protocol.to_string()));
        }

        for (name, value) in extra {
            let lower = name.to_lowercase();
            let overridden = MANDATORY_HEADERS.contains(&lower.as_str())
                || (protocol.is_some() && lower == "sec-websocket-protocol");
            if !overridden {
                headers.push((name.clone(), value.clone()));
            }
        }

        Self {
            resource: endpoint.resource(),
            headers,
        }
    }

    /// Look up a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Write the HTTP request to a buffer.
    ///
    /// # Errors
    /// Returns `Error::InvalidHeaderValue` if a header name or value contains
    /// CR/LF, or the request target does.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        validate_header_value("request-target", &self.resource)?;

        buf.extend_from_slice(format!("GET {} HTTP/1.1\r\n", self.resource).as_bytes());
        let lines = self
            .headers
            .iter()
            .map(|(name, value)| {
                validate_header_value(name, name)?;
                validate_header_value(name, value)?;
                Ok(format!("{name}: {value}"))
            })
            .collect::<Result<Vec<_>>>()?;
        buf.extend_from_slice(lines.join("\r\n").as_bytes());
        buf.extend_from_slice(HEADER_TERMINATOR);
        Ok(())
    }
}

/// Parsed server response to the upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// First line of the response.
    pub status_line: String,
    headers: HashMap<String, String>,
}

impl HandshakeResponse {
    /// Parse the response header block (everything before the blank line).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handshake`] if the block is not valid UTF-8.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::handshake("response", Some("invalid UTF-8")))?;

        let (status_line, rest) = text.split_once("\r\n").unwrap_or((text, ""));
        let headers = parse_headers(rest.split("\r\n"));

        Ok(Self {
            status_line: status_line.to_string(),
            headers,
        })
    }

    /// Look up a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Check the response against the fixed upgrade response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handshake`] naming the first mismatching field:
    /// `status-line`, `Connection` (must be `Upgrade`) or `Upgrade` (must be
    /// `WebSocket`). Comparisons are exact.
    pub fn validate(&self) -> Result<()> {
        if self.status_line != EXPECTED_STATUS_LINE {
            return Err(Error::handshake("status-line", Some(&self.status_line)));
        }

        let connection = self.header("connection");
        if connection != Some("Upgrade") {
            return Err(Error::handshake("Connection", connection));
        }

        let upgrade = self.header("upgrade");
        if upgrade != Some("WebSocket") {
            return Err(Error::handshake("Upgrade", upgrade));
        }

        Ok(())
    }
}

/// Run the upgrade handshake over `stream`.
///
/// Sends the request, reads until the end of the response headers without any
/// timeout, validates the response and returns whatever the server sent after
/// the blank line. Those bytes already belong to the frame stream.
///
/// # Errors
///
/// - [`Error::InvalidHeaderValue`] if the request cannot be serialized
/// - [`Error::HandshakeTooLarge`] if the header block exceeds the limit
/// - [`Error::Handshake`] on a mismatching response or early end of stream
/// - [`Error::Transport`] on I/O failure
pub async fn negotiate<S>(
    stream: &mut S,
    request: &HandshakeRequest,
    limits: &Limits,
    read_size: usize,
) -> Result<BytesMut>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut out = Vec::new();
    request.write(&mut out)?;
    stream.write_all(&out).await?;
    stream.flush().await?;
    tracing::debug!(resource = %request.resource, "sent upgrade request");

    let mut buf = BytesMut::with_capacity(read_size);
    let end = loop {
        if let Some(pos) = find_terminator(&buf) {
            limits.check_handshake_size(pos)?;
            break pos;
        }
        limits.check_handshake_size(buf.len())?;

        buf.reserve(read_size);
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Err(Error::handshake(
                "response",
                Some("end of stream before end of headers"),
            ));
        }
        tracing::trace!(bytes = n, "read handshake response bytes");
    };

    let head = buf.split_to(end + HEADER_TERMINATOR.len());
    let response = HandshakeResponse::parse(&head[..end])?;
    response.validate()?;

    tracing::debug!(leftover = buf.len(), "handshake accepted");
    Ok(buf)
}
