//! Connection lifecycle: state machine, application callbacks and the client
//! that drives a connection on a background task.
//!
//! ## Connection Lifecycle
//!
//! 1. **Created** - Client built, nothing on the network
//! 2. **Connecting** - Endpoint resolved, transport opening
//! 3. **HandshakeInFlight** - Upgrade request sent
//! 4. **Open** - Frames flow both ways
//! 5. **Closed** / **Failed** - Worker finished

mod client;
mod handler;
mod state;

pub use client::{Client, Sender};
pub use handler::Handler;
pub use state::ConnectionState;
