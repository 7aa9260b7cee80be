use koruza_frame::{FrameReader, FrameStats, FrameWriter, MessageQueue};
use koruza_message::Message;
use koruza_transport::SerialTransport;

use crate::error::Result;

/// One serial transport with its frame reader and writer.
pub struct PeerLink {
    transport: Box<dyn SerialTransport>,
    reader: FrameReader<MessageQueue>,
    writer: FrameWriter,
    failing: bool,
}

impl PeerLink {
    pub fn new(transport: Box<dyn SerialTransport>) -> Self {
        Self {
            transport,
            reader: FrameReader::new(MessageQueue::new()),
            writer: FrameWriter::new(),
            failing: false,
        }
    }

    pub fn name(&self) -> &str {
        self.transport.name()
    }

    /// Read everything available and return the verified messages in
    /// arrival order.
    pub fn receive(&mut self) -> Result<Vec<Message>> {
        self.reader.read_from(self.transport.as_mut())?;
        Ok(self.reader.handler_mut().drain().collect())
    }

    pub fn send(&mut self, message: &Message) -> Result<()> {
        self.writer.send(self.transport.as_mut(), message)?;
        Ok(())
    }

    pub fn stats(&self) -> FrameStats {
        self.reader.stats()
    }

    /// Record the outcome of an I/O attempt. Returns `true` on the first
    /// failure after a success, so callers log each outage once.
    pub(crate) fn note_failure(&mut self, failed: bool) -> bool {
        let edge = failed && !self.failing;
        self.failing = failed;
        edge
    }
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerLink")
            .field("transport", &self.transport.name())
            .field("stats", &self.reader.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use koruza_frame::frame_message;
    use koruza_message::{Command, Reply};
    use koruza_transport::MemoryTransport;

    use super::*;
    use crate::error::SupervisorError;

    #[test]
    fn send_and_receive() {
        let (host, mut device) = MemoryTransport::pair();
        let mut link = PeerLink::new(Box::new(host));

        link.send(&Message::command(Command::GetStatus)).unwrap();
        let wire = device.read().unwrap().unwrap();
        assert_eq!(
            wire,
            frame_message(&Message::command(Command::GetStatus), usize::MAX).unwrap()
        );

        device
            .write(&frame_message(&Message::reply(Reply::StatusReport), usize::MAX).unwrap())
            .unwrap();
        let received = link.receive().unwrap();
        assert_eq!(received, vec![Message::reply(Reply::StatusReport)]);
        assert_eq!(link.stats().delivered, 1);
        assert!(link.receive().unwrap().is_empty());
    }

    #[test]
    fn closed_transport_surfaces_as_error() {
        let (host, device) = MemoryTransport::pair();
        let mut link = PeerLink::new(Box::new(host));
        device.close();
        assert!(matches!(link.receive(), Err(SupervisorError::Frame(_))));
    }

    #[test]
    fn failure_edges() {
        let (host, _device) = MemoryTransport::pair();
        let mut link = PeerLink::new(Box::new(host));
        assert!(link.note_failure(true));
        assert!(!link.note_failure(true));
        assert!(!link.note_failure(false));
        assert!(link.note_failure(true));
    }
}
