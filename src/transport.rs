//! Byte transport under the protocol: TCP, optionally wrapped in TLS.
//!
//! After the handshake the stream is split. The connection worker owns the
//! [`TransportReader`]; the [`TransportWriter`] is shared with every sender and
//! serializes writes behind an async mutex. The two directions never share a
//! lock.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::config::VerifyMode;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};

/// A plaintext or TLS client stream.
pub enum MaybeTlsStream {
    /// `ws://`
    Plain(TcpStream),
    /// `wss://`
    #[cfg(feature = "tls-rustls")]
    Tls(Box<crate::tls::TlsStream<TcpStream>>),
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls-rustls")]
            MaybeTlsStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Open a connection to `endpoint`, with TLS for `wss://`.
///
/// # Errors
///
/// Returns [`Error::Connect`] on DNS, TCP or TLS failure, or when a `wss://`
/// endpoint is used without the `tls-rustls` feature.
pub async fn connect(
    endpoint: &Endpoint,
    verify_mode: VerifyMode,
    ca_certificates: Option<&Path>,
) -> Result<MaybeTlsStream> {
    let host = endpoint.connect_host();
    let tcp = TcpStream::connect((host, endpoint.port))
        .await
        .map_err(|e| Error::Connect(format!("{}:{}: {}", host, endpoint.port, e)))?;
    tracing::debug!(host, port = endpoint.port, "tcp connected");

    if !endpoint.scheme.is_secure() {
        return Ok(MaybeTlsStream::Plain(tcp));
    }

    #[cfg(feature = "tls-rustls")]
    {
        let config = crate::tls::client_config(verify_mode, ca_certificates)?;
        let stream = crate::tls::TlsConnector::new(config)
            .connect(host, tcp)
            .await?;
        tracing::debug!(host, ?verify_mode, "tls established");
        Ok(MaybeTlsStream::Tls(Box::new(stream)))
    }

    #[cfg(not(feature = "tls-rustls"))]
    {
        let _ = (tcp, verify_mode, ca_certificates);
        Err(Error::Connect(
            "wss:// requires the tls-rustls feature".to_string(),
        ))
    }
}

/// Outcome of a single bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Bytes read from the peer.
    Data(Bytes),
    /// Nothing arrived within the timeout; the connection is still usable.
    Timeout,
    /// The peer closed its side.
    EndOfStream,
}

/// Read side of an established connection.
pub struct TransportReader<R> {
    io: R,
}

impl<R: AsyncRead + Unpin> TransportReader<R> {
    pub fn new(io: R) -> Self {
        Self { io }
    }

    /// Perform one read of at most `max_bytes`, bounded by `timeout`.
    ///
    /// With `timeout = None` the read blocks until data or end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the read fails.
    pub async fn receive(
        &mut self,
        max_bytes: usize,
        timeout: Option<Duration>,
    ) -> Result<Received> {
        let mut buf = BytesMut::zeroed(max_bytes.max(1));

        let read = self.io.read(&mut buf[..]);
        let n = match timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result?,
                Err(_) => return Ok(Received::Timeout),
            },
            None => read.await?,
        };

        if n == 0 {
            return Ok(Received::EndOfStream);
        }
        buf.truncate(n);
        Ok(Received::Data(buf.freeze()))
    }
}

type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// Write side of an established connection. Cheap to clone.
#[derive(Clone)]
pub struct TransportWriter {
    io: Arc<Mutex<Option<BoxedWrite>>>,
}

impl TransportWriter {
    pub fn new<W>(io: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            io: Arc::new(Mutex::new(Some(Box::new(io)))),
        }
    }

    /// Write and flush `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the write fails or the writer was closed.
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.io.lock().await;
        let io = guard
            .as_mut()
            .ok_or_else(|| Error::Transport("transport closed".to_string()))?;
        io.write_all(bytes).await?;
        io.flush().await?;
        Ok(())
    }

    /// Shut down and release the write side. Idempotent.
    pub async fn close(&self) {
        if let Some(mut io) = self.io.lock().await.take() {
            if let Err(e) = io.shutdown().await {
                tracing::trace!(error = %e, "shutdown on close failed");
            }
        }
    }

    /// Release the write side without a shutdown, for use where awaiting is
    /// not possible. Does nothing while a write is in flight.
    pub fn abandon(&self) {
        if let Ok(mut io) = self.io.try_lock() {
            io.take();
        }
    }

    /// Check if [`close`](Self::close) or [`abandon`](Self::abandon) has run.
    pub async fn is_closed(&self) -> bool {
        self.io.lock().await.is_none()
    }
}

/// Split an established stream into its read and write sides.
pub fn split<S>(stream: S) -> (TransportReader<tokio::io::ReadHalf<S>>, TransportWriter)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read, write) = tokio::io::split(stream);
    (TransportReader::new(read), TransportWriter::new(write))
}
