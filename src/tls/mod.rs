//! TLS support for `wss://` connections.
//!
//! Built on rustls (feature `tls-rustls`, enabled by default). The trust mode
//! comes from [`VerifyMode`](crate::VerifyMode).

mod rustls_impl;

pub use rustls_impl::{TlsConnector, TlsError, TlsStream, client_config, load_certs_from_file};
