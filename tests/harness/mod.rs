//! Test harness for exercising the client against a local draft-protocol
//! server.
//!
//! The crate only ships a client, so the fake server speaks the wire format
//! directly.

#![allow(dead_code)]

mod recorder;
mod server;

pub use recorder::{Event, Events, Recorder};
pub use server::{ACCEPT, Behavior, TestServer, serve_connection};
