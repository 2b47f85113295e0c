//! Connect to a draft-protocol echo server, send a few lines and print what
//! comes back.
//!
//! Run with: cargo run --example echo_client -- ws://127.0.0.1:9001/
//! Set `RUST_LOG=hixie_ws=debug` to see the connection lifecycle.

use std::error::Error;
use std::time::Duration;

use hixie_ws::{Client, Config, ConnectionState, Handler};
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "ws://127.0.0.1:9001/";

struct Printer;

impl Handler for Printer {
    fn on_open(&mut self) {
        println!("Handshake complete");
    }

    fn on_message(&mut self, payload: String) {
        println!("Received: {}", payload);
    }

    fn on_close(&mut self) {
        println!("Server closed the connection");
    }

    fn on_error(&mut self, error: &hixie_ws::Error) {
        eprintln!("Connection failed: {}", error);
    }

    fn on_timeout(&mut self) {
        println!("(idle)");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    println!("Connecting to {}", url);

    let config = Config::new(url).with_timeout(Duration::from_secs(1));
    let mut client = Client::new(config, Printer);
    client.start()?;

    let mut states = client.state_changes();
    let state = *states
        .wait_for(|s| *s == ConnectionState::Open || s.is_terminal())
        .await?;

    if state == ConnectionState::Open {
        for line in ["Hello", "from", "hixie-ws"] {
            println!("Sending: {}", line);
            client.send(line).await?;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
        println!("Stopping...");
        client.stop();
    }

    client.join().await?;
    Ok(())
}
