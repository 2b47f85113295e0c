//! Client connection state machine.

/// Lifecycle state of a [`Client`](crate::Client).
///
/// `Created → Connecting → HandshakeInFlight → Open → Closed`, with any state
/// able to move to `Failed` on an unrecoverable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Client built, `start()` not called yet.
    #[default]
    Created,
    /// Resolving the endpoint and opening the transport.
    Connecting,
    /// Upgrade request sent, waiting for a valid response.
    HandshakeInFlight,
    /// Handshake validated; frames flow in both directions.
    Open,
    /// Peer closed the stream or a stop request was honored.
    Closed,
    /// Ended on an error, reported through `on_error`.
    Failed,
}

impl ConnectionState {
    /// Check if the worker has finished in this state.
    ///
    /// Returns `true` for `Closed` and `Failed`.
    #[must_use]
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }

    /// Check if sending data is allowed in this state.
    ///
    /// Returns `true` only for `Open` state.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Created => write!(f, "Created"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::HandshakeInFlight => write!(f, "HandshakeInFlight"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closed => write!(f, "Closed"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}
