use koruza_transport::SerialTransport;

use crate::codec::FrameDecoder;
use crate::error::Result;
use crate::parser::{FrameParser, FrameStats, MessageHandler};

/// Upper bound on transport reads per call so a chatty peer cannot starve
/// the caller's loop.
const MAX_READS_PER_CALL: usize = 16;

/// Pulls bytes from a transport and feeds them through a [`FrameParser`].
///
/// The reader does not own the transport, so the same device can be shared
/// with a [`FrameWriter`](crate::FrameWriter).
#[derive(Debug)]
pub struct FrameReader<H> {
    parser: FrameParser<H>,
}

impl<H: MessageHandler> FrameReader<H> {
    pub fn new(handler: H) -> Self {
        Self {
            parser: FrameParser::new(handler),
        }
    }

    pub fn with_decoder(decoder: FrameDecoder, handler: H) -> Self {
        Self {
            parser: FrameParser::with_decoder(decoder, handler),
        }
    }

    /// Drain whatever the transport has ready without blocking past its
    /// read timeout. Returns the number of messages delivered.
    pub fn read_from<T>(&mut self, transport: &mut T) -> Result<usize>
    where
        T: SerialTransport + ?Sized,
    {
        let mut delivered = 0usize;
        for _ in 0..MAX_READS_PER_CALL {
            match transport.read()? {
                Some(chunk) => delivered += self.parser.push_buffer(&chunk),
                None => break,
            }
        }
        Ok(delivered)
    }

    pub fn stats(&self) -> FrameStats {
        self.parser.stats()
    }

    pub fn handler(&self) -> &H {
        self.parser.handler()
    }

    pub fn handler_mut(&mut self) -> &mut H {
        self.parser.handler_mut()
    }
}
