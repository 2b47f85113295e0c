//! Scripted draft-protocol server on a random local port.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The only upgrade response the client accepts.
pub const ACCEPT: &[u8] = b"HTTP/1.1 101 Web Socket Protocol Handshake\r\n\
    Upgrade: WebSocket\r\n\
    Connection: Upgrade\r\n\
    WebSocket-Origin: http://127.0.0.1\r\n\
    WebSocket-Location: ws://127.0.0.1/\r\n\
    \r\n";

/// What the server does with each accepted connection.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Accept, then echo every complete frame back verbatim.
    Echo,
    /// Accept, write each chunk separately, then close.
    Push(Vec<Vec<u8>>),
    /// Write these bytes as the handshake response, then close.
    Reject(Vec<u8>),
    /// Accept, then never send anything until the client goes away.
    Silent,
}

pub struct TestServer {
    addr: SocketAddr,
    requests: mpsc::UnboundedReceiver<String>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, requests) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, behavior.clone(), tx.clone()));
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Next upgrade request head received, as text.
    pub async fn next_request(&mut self) -> String {
        tokio::time::timeout(std::time::Duration::from_secs(5), self.requests.recv())
            .await
            .expect("no request within 5s")
            .expect("server stopped")
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Run `behavior` over one connection, reporting the request head to
/// `requests`.
pub async fn serve_connection<S>(
    mut stream: S,
    behavior: Behavior,
    requests: mpsc::UnboundedSender<String>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    let _ = requests.send(request);

    match behavior {
        Behavior::Echo => {
            if stream.write_all(ACCEPT).await.is_err() {
                return;
            }
            echo(&mut stream).await;
        }
        Behavior::Push(chunks) => {
            if stream.write_all(ACCEPT).await.is_err() {
                return;
            }
            for chunk in chunks {
                if stream.write_all(&chunk).await.is_err() {
                    return;
                }
                let _ = stream.flush().await;
                tokio::task::yield_now().await;
            }
            let _ = stream.shutdown().await;
        }
        Behavior::Reject(response) => {
            let _ = stream.write_all(&response).await;
            let _ = stream.shutdown().await;
        }
        Behavior::Silent => {
            if stream.write_all(ACCEPT).await.is_err() {
                return;
            }
            let mut sink = [0u8; 1024];
            while matches!(stream.read(&mut sink).await, Ok(n) if n > 0) {}
        }
    }
}

async fn read_request<S: AsyncRead + Unpin>(stream: &mut S) -> Option<String> {
    let mut head = Vec::new();
    let mut chunk = [0u8; 512];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        head.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8(head).ok()
}

async fn echo<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut S) {
    let mut pending = Vec::new();
    let mut chunk = [0u8; 2048];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        pending.extend_from_slice(&chunk[..n]);

        while let Some(end) = pending.iter().position(|&b| b == 0xFF) {
            let frame: Vec<u8> = pending.drain(..=end).collect();
            if stream.write_all(&frame).await.is_err() {
                return;
            }
        }
    }
}
