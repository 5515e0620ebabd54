//! A [`MessageHandler`] that records every callback.

use async_trait::async_trait;
use bytes::Bytes;
use wsframe::{DecodeError, MessageFlags, MessageHandler};

/// One observed callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(u16, String),
    /// Close code of a reported failure.
    Error(u16),
}

/// Handler collecting [`Event`]s in delivery order.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Vec<Event>,
    flags: Vec<MessageFlags>,
}

impl RecordingHandler {
    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[Event] { &self.events }

    /// Flags of each recorded message; errors record none.
    #[must_use]
    pub fn flags(&self) -> &[MessageFlags] { &self.flags }

    /// Remove and return the recorded events.
    pub fn take(&mut self) -> Vec<Event> {
        self.flags.clear();
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, event: Event, flags: MessageFlags) {
        self.events.push(event);
        self.flags.push(flags);
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn on_text(&mut self, text: String, flags: MessageFlags) { self.record(Event::Text(text), flags); }

    async fn on_binary(&mut self, data: Bytes, flags: MessageFlags) {
        self.record(Event::Binary(data.to_vec()), flags);
    }

    async fn on_ping(&mut self, data: Bytes, flags: MessageFlags) { self.record(Event::Ping(data.to_vec()), flags); }

    async fn on_pong(&mut self, data: Bytes, flags: MessageFlags) { self.record(Event::Pong(data.to_vec()), flags); }

    async fn on_close(&mut self, code: u16, reason: String, flags: MessageFlags) {
        self.record(Event::Close(code, reason), flags);
    }

    async fn on_error(&mut self, error: &DecodeError) { self.events.push(Event::Error(error.close_code())); }
}
