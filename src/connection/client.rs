use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::connection::{ConnectionState, Handler};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::protocol::frame::{self, FrameDecoder};
use crate::protocol::handshake::{self, HandshakeRequest};
use crate::transport::{self, Received, TransportReader, TransportWriter};

/// State visible to both the worker and the caller-side handles.
struct Shared {
    state: watch::Sender<ConnectionState>,
    stop: AtomicBool,
    opened: AtomicBool,
    writer: OnceLock<TransportWriter>,
    write_failure: std::sync::Mutex<Option<Error>>,
}

impl Shared {
    fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Created);
        Self {
            state,
            stop: AtomicBool::new(false),
            opened: AtomicBool::new(false),
            writer: OnceLock::new(),
            write_failure: std::sync::Mutex::new(None),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        if next == ConnectionState::Open {
            self.opened.store(true, Ordering::Release);
        }
        let prev = self.state.send_replace(next);
        tracing::debug!(from = %prev, to = %next, "state transition");
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn record_write_failure(&self, error: Error) {
        if let Ok(mut slot) = self.write_failure.lock() {
            slot.get_or_insert(error);
        }
    }

    fn take_write_failure(&self) -> Option<Error> {
        self.write_failure.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Tear down after the worker ended without reaching `finish`.
    fn abandon(&self) {
        if let Some(writer) = self.writer.get() {
            writer.abandon();
        }
        let state = self.state();
        if !state.is_terminal() {
            tracing::warn!(%state, "connection worker ended abnormally");
            self.set_state(ConnectionState::Failed);
        }
    }
}

/// Marks the connection `Failed` if the worker future is dropped before it
/// finishes, as happens when a handler callback panics.
struct AbandonGuard {
    shared: Arc<Shared>,
    armed: bool,
}

impl AbandonGuard {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if self.armed {
            self.shared.abandon();
        }
    }
}

/// A client connection to one draft-protocol WebSocket endpoint.
///
/// The connection runs on its own tokio task once [`start`](Self::start) is
/// called; events reach the application through the [`Handler`].
///
/// ## Example
///
/// ```rust,no_run
/// use hixie_ws::{Client, Config, Handler};
///
/// struct Printer;
///
/// impl Handler for Printer {
///     fn on_message(&mut self, payload: String) {
///         println!("received: {payload}");
///     }
/// }
///
/// # async fn run() -> hixie_ws::Result<()> {
/// let mut client = Client::new(Config::new("ws://localhost:9001/chat"), Printer);
/// client.start()?;
/// let mut states = client.state_changes();
/// states.wait_for(|s| s.can_send() || s.is_terminal()).await.ok();
/// client.send("hello").await?;
/// client.join().await
/// # }
/// ```
pub struct Client<H> {
    config: Config,
    handler: Option<H>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl<H: Handler> Client<H> {
    /// Create a client. Nothing happens on the network until `start`.
    pub fn new(config: Config, handler: H) -> Self {
        Self {
            config,
            handler: Some(handler),
            shared: Arc::new(Shared::new()),
            worker: None,
        }
    }

    /// Spawn the connection worker on the current tokio runtime.
    ///
    /// Returns as soon as the worker is spawned. Resolution, connect and
    /// handshake failures are reported through `on_error` and `join`.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyStarted` on a second call
    /// - `Error::NoRuntime` when called outside a tokio runtime
    pub fn start(&mut self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let handler = self.handler.take().ok_or(Error::AlreadyStarted)?;

        self.shared.set_state(ConnectionState::Connecting);
        let worker = Worker {
            config: self.config.clone(),
            shared: Arc::clone(&self.shared),
            handler,
        };
        self.worker = Some(runtime.spawn(worker.run()));
        Ok(())
    }

    /// Ask the worker to stop.
    ///
    /// The flag is checked between reads, so with no receive timeout
    /// configured a quiet connection only notices it once more data or end of
    /// stream arrives. `on_close` does not fire for a local stop.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Check if the connection has ever reached `Open`.
    ///
    /// Stays `true` after the connection closes or fails; use
    /// [`state`](Self::state) for the current state.
    pub fn ready(&self) -> bool {
        self.shared.opened.load(Ordering::Acquire)
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Subscribe to state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Get a cloneable handle for sending from other tasks.
    pub fn sender(&self) -> Sender {
        Sender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Send a text message.
    ///
    /// # Errors
    ///
    /// See [`Sender::send`].
    pub async fn send(&self, message: &str) -> Result<()> {
        self.sender().send(message).await
    }

    /// Wait for the worker to finish and return how it ended.
    ///
    /// `Ok(())` after a remote close or a stop request, the error that was
    /// passed to `on_error` otherwise. Returns `Ok(())` immediately if the
    /// client was never started or was already joined.
    ///
    /// A panicking handler callback leaves the connection `Failed` with the
    /// write side released.
    ///
    /// # Errors
    ///
    /// The worker's error, or `Error::Worker` if the task panicked.
    pub async fn join(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(worker) => worker.await.map_err(|e| Error::Worker(e.to_string()))?,
            None => Ok(()),
        }
    }
}

impl<H> Drop for Client<H> {
    /// Dropping the client requests a stop; the worker exits at its next poll.
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
    }
}

/// Cloneable send handle for a [`Client`].
#[derive(Clone)]
pub struct Sender {
    shared: Arc<Shared>,
}

impl Sender {
    /// Encode `message` as one frame and write it.
    ///
    /// A write failure is returned here and also ends the connection: the
    /// worker reports it through `on_error` at its next poll.
    ///
    /// # Errors
    ///
    /// - `Error::NotOpen` unless the connection is `Open`
    /// - `Error::Transport` if the write fails
    pub async fn send(&self, message: &str) -> Result<()> {
        let state = self.shared.state();
        if !state.can_send() {
            return Err(Error::NotOpen(state));
        }
        let writer = self.shared.writer.get().ok_or(Error::NotOpen(state))?;

        let wire = frame::encode(message);
        if let Err(e) = writer.send(&wire).await {
            tracing::warn!(error = %e, "send failed");
            self.shared.record_write_failure(e.clone());
            return Err(e);
        }
        tracing::trace!(bytes = wire.len(), "sent frame");
        Ok(())
    }
}

/// Everything the background task owns.
struct Worker<H> {
    config: Config,
    shared: Arc<Shared>,
    handler: H,
}

impl<H: Handler> Worker<H> {
    async fn run(mut self) -> Result<()> {
        let guard = AbandonGuard::new(Arc::clone(&self.shared));
        let result = self.connect_and_serve().await;
        let result = self.finish(result).await;
        guard.disarm();
        result
    }

    async fn connect_and_serve(&mut self) -> Result<()> {
        let endpoint = Endpoint::parse(&self.config.url)?;
        tracing::debug!(url = %self.config.url, port = endpoint.port, "resolved endpoint");

        let stream = transport::connect(
            &endpoint,
            self.config.verify_mode,
            self.config.ca_certificates.as_deref(),
        )
        .await?;

        self.establish(stream, &endpoint).await
    }

    /// Handshake over an already connected stream, then serve it.
    async fn establish<S>(&mut self, mut stream: S, endpoint: &Endpoint) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        self.shared.set_state(ConnectionState::HandshakeInFlight);

        let request = HandshakeRequest::new(
            endpoint,
            &self.config.headers,
            self.config.subprotocol.as_deref(),
        );
        let buffer = handshake::negotiate(
            &mut stream,
            &request,
            &self.config.limits,
            self.config.read_buffer_size,
        )
        .await?;

        let (reader, writer) = transport::split(stream);
        // A worker is only ever spawned once per `Shared`, so the cell is empty.
        let _ = self.shared.writer.set(writer);

        self.shared.set_state(ConnectionState::Open);
        self.handler.on_open();

        self.serve(reader, buffer).await
    }

    async fn serve<R>(&mut self, mut reader: TransportReader<R>, mut buffer: BytesMut) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut decoder = FrameDecoder::new();
        loop {
            if self.shared.stop_requested() {
                tracing::debug!("stop requested");
                self.shared.set_state(ConnectionState::Closed);
                return Ok(());
            }
            if let Some(err) = self.shared.take_write_failure() {
                return Err(err);
            }

            // Frames ahead of a framing violation are delivered before it is
            // reported.
            while let Some(frame) = decoder.decode(&mut buffer)? {
                tracing::trace!(bytes = frame.payload().len(), "frame received");
                self.handler.on_message(frame.into_text()?);
            }
            self.config.limits.check_buffered_frame(buffer.len())?;

            match reader
                .receive(self.config.read_buffer_size, self.config.timeout)
                .await?
            {
                Received::Data(bytes) => {
                    tracing::trace!(bytes = bytes.len(), "read");
                    buffer.extend_from_slice(&bytes);
                }
                Received::Timeout => self.handler.on_timeout(),
                Received::EndOfStream => {
                    tracing::debug!("peer closed the connection");
                    self.shared.set_state(ConnectionState::Closed);
                    self.handler.on_close();
                    return Ok(());
                }
            }
        }
    }

    async fn finish(&mut self, result: Result<()>) -> Result<()> {
        if let Some(writer) = self.shared.writer.get() {
            writer.close().await;
        }

        if let Err(err) = &result {
            tracing::warn!(error = %err, state = %self.shared.state(), "connection failed");
            self.handler.on_error(err);
            self.shared.set_state(ConnectionState::Failed);
        }
        result
    }
}
