use std::collections::VecDeque;

use bytes::Bytes;
use koruza_message::Message;
use tracing::debug;

use crate::codec::FrameDecoder;

/// Receives every message that survives framing and checksum verification.
pub trait MessageHandler {
    fn handle(&mut self, message: &Message);
}

impl<F> MessageHandler for F
where
    F: FnMut(&Message),
{
    fn handle(&mut self, message: &Message) {
        self(message)
    }
}

/// Handler that buffers messages for later draining.
#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: VecDeque<Message>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn pop(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    /// Remove and return all buffered messages in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = Message> + '_ {
        self.messages.drain(..)
    }
}

impl MessageHandler for MessageQueue {
    fn handle(&mut self, message: &Message) {
        self.messages.push_back(message.clone());
    }
}

/// Counters for a parser's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Messages handed to the handler.
    pub delivered: u64,
    /// Frames dropped for exceeding the length limit.
    pub oversized: u64,
    /// Frames whose payload failed to parse or verify.
    pub rejected: u64,
}

/// Decodes frames from a byte stream and delivers parsed messages.
#[derive(Debug)]
pub struct FrameParser<H> {
    decoder: FrameDecoder,
    handler: H,
    delivered: u64,
    rejected: u64,
}

impl<H: MessageHandler> FrameParser<H> {
    pub fn new(handler: H) -> Self {
        Self::with_decoder(FrameDecoder::new(), handler)
    }

    pub fn with_decoder(decoder: FrameDecoder, handler: H) -> Self {
        Self {
            decoder,
            handler,
            delivered: 0,
            rejected: 0,
        }
    }

    /// Feed one byte.
    pub fn push_byte(&mut self, byte: u8) {
        if let Some(payload) = self.decoder.push_byte(byte) {
            self.dispatch(payload);
        }
    }

    /// Feed a buffer. Returns the number of messages delivered.
    pub fn push_buffer(&mut self, data: &[u8]) -> usize {
        let before = self.delivered;
        for &byte in data {
            self.push_byte(byte);
        }
        (self.delivered - before) as usize
    }

    fn dispatch(&mut self, payload: Bytes) {
        match Message::parse(&payload) {
            Ok(message) => {
                self.delivered += 1;
                self.handler.handle(&message);
            }
            Err(err) => {
                self.rejected += 1;
                debug!(error = %err, len = payload.len(), "dropping invalid frame");
            }
        }
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            delivered: self.delivered,
            oversized: self.decoder.oversized(),
            rejected: self.rejected,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}
