//! Application callbacks.

use crate::error::Error;

/// Event hooks invoked by the connection worker.
///
/// Every method defaults to a no-op. All calls happen on the worker task, in
/// order, never concurrently with each other.
pub trait Handler: Send + 'static {
    /// The handshake succeeded and the connection is open.
    fn on_open(&mut self) {}

    /// A complete text frame arrived.
    fn on_message(&mut self, payload: String) {
        let _ = payload;
    }

    /// The peer closed the connection. Not called for a local `stop()`.
    fn on_close(&mut self) {}

    /// The connection failed; no further callbacks follow.
    fn on_error(&mut self, error: &Error) {
        let _ = error;
    }

    /// A read timed out; the connection is still open.
    fn on_timeout(&mut self) {}
}

impl Handler for () {}
