//! Handler that forwards every callback into a channel.

use std::time::Duration;

use hixie_ws::{Error, Handler};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open,
    Message(String),
    Close,
    Error(Error),
    Timeout,
}

pub struct Recorder(mpsc::UnboundedSender<Event>);

impl Recorder {
    pub fn new() -> (Self, Events) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), Events(rx))
    }
}

impl Handler for Recorder {
    fn on_open(&mut self) {
        let _ = self.0.send(Event::Open);
    }

    fn on_message(&mut self, payload: String) {
        let _ = self.0.send(Event::Message(payload));
    }

    fn on_close(&mut self) {
        let _ = self.0.send(Event::Close);
    }

    fn on_error(&mut self, error: &Error) {
        let _ = self.0.send(Event::Error(error.clone()));
    }

    fn on_timeout(&mut self) {
        let _ = self.0.send(Event::Timeout);
    }
}

pub struct Events(mpsc::UnboundedReceiver<Event>);

impl Events {
    /// Next event, or `None` once the worker dropped the handler.
    pub async fn next(&mut self) -> Option<Event> {
        tokio::time::timeout(Duration::from_secs(5), self.0.recv())
            .await
            .expect("no event within 5s")
    }

    /// Next event other than `Timeout`.
    pub async fn next_skipping_timeouts(&mut self) -> Option<Event> {
        loop {
            match self.next().await {
                Some(Event::Timeout) => continue,
                other => return other,
            }
        }
    }

    /// All events delivered so far, without waiting.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.0.try_recv() {
            events.push(event);
        }
        events
    }
}
