//! # hixie-ws - Legacy draft WebSocket client
//!
//! `hixie-ws` speaks the pre-RFC "hixie" draft of the WebSocket protocol: an
//! HTTP upgrade whose response must match exactly, followed by UTF-8 text
//! frames delimited by `0x00` and `0xFF`.
//!
//! ## Features
//!
//! - **Background worker** on the tokio runtime with ordered callbacks
//! - **Exact handshake validation** with the mismatching field reported
//! - **Streaming frame decoder** tolerant of arbitrary read boundaries
//! - **TLS** for wss:// via rustls, verification optional
//! - **Resource limits** on the handshake and partial frames
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hixie_ws::{Client, Config, Handler};
//!
//! struct Echo;
//!
//! impl Handler for Echo {
//!     fn on_message(&mut self, payload: String) {
//!         println!("{payload}");
//!     }
//! }
//!
//! # async fn run() -> hixie_ws::Result<()> {
//! let mut client = Client::new(Config::new("ws://localhost:9001/"), Echo);
//! client.start()?;
//! client.join().await
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod protocol;
pub mod transport;

pub use config::{Config, Limits, VerifyMode};
pub use connection::{Client, ConnectionState, Handler, Sender};
pub use endpoint::{Endpoint, Scheme};
pub use error::{Error, Result};
pub use protocol::{Frame, HandshakeRequest, HandshakeResponse};

#[cfg(feature = "tls-rustls")]
pub mod tls;
