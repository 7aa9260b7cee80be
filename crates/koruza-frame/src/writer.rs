use bytes::BytesMut;
use koruza_message::Message;
use koruza_transport::SerialTransport;
use tracing::trace;

use crate::codec::{encode_frame, FRAME_MAX_LENGTH};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Serializes, frames and writes messages to a transport.
#[derive(Debug)]
pub struct FrameWriter {
    payload: BytesMut,
    frame: BytesMut,
    capacity: usize,
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameWriter {
    pub fn new() -> Self {
        Self::with_capacity(FRAME_MAX_LENGTH)
    }

    /// Writer that refuses frames larger than `capacity` bytes on the wire.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            payload: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            frame: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            capacity,
        }
    }

    /// Send one message as a single frame.
    pub fn send<T>(&mut self, transport: &mut T, message: &Message) -> Result<()>
    where
        T: SerialTransport + ?Sized,
    {
        self.payload.clear();
        self.frame.clear();
        message.serialize_into(&mut self.payload, FRAME_MAX_LENGTH)?;
        encode_frame(&self.payload, &mut self.frame, self.capacity)?;

        trace!(
            transport = transport.name(),
            len = self.frame.len(),
            %message,
            "sending frame"
        );
        transport.write(&self.frame)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use koruza_message::{Command, MotorPosition};
    use koruza_transport::{MemoryTransport, TransportError};

    use super::*;
    use crate::codec::frame_message;
    use crate::error::FrameError;
    use crate::parser::{FrameParser, MessageQueue};

    #[test]
    fn writes_exactly_one_frame() {
        let (mut host, mut device) = MemoryTransport::pair();
        let mut msg = Message::command(Command::MoveMotor);
        msg.add_motor_position(&MotorPosition::new(10, 20, -15));

        FrameWriter::new().send(&mut host, &msg).unwrap();

        let wire = device.read().unwrap().unwrap();
        assert_eq!(wire, frame_message(&msg, usize::MAX).unwrap());

        let mut parser = FrameParser::new(MessageQueue::new());
        assert_eq!(parser.push_buffer(&wire), 1);
        assert_eq!(parser.into_handler().pop().unwrap(), msg);
    }

    #[test]
    fn buffers_are_reused_between_sends() {
        let (mut host, mut device) = MemoryTransport::pair();
        let mut writer = FrameWriter::new();

        writer
            .send(&mut host, &Message::command(Command::GetStatus))
            .unwrap();
        writer
            .send(&mut host, &Message::command(Command::Reboot))
            .unwrap();

        let wire = device.read().unwrap().unwrap();
        let mut parser = FrameParser::new(MessageQueue::new());
        assert_eq!(parser.push_buffer(&wire), 2);
        let mut queue = parser.into_handler();
        assert_eq!(queue.pop().unwrap().command_code(), Some(Command::GetStatus));
        assert_eq!(queue.pop().unwrap().command_code(), Some(Command::Reboot));
    }

    #[test]
    fn oversized_message_is_not_written() {
        let (mut host, device) = MemoryTransport::pair();
        let mut writer = FrameWriter::with_capacity(8);

        let err = writer
            .send(&mut host, &Message::command(Command::GetStatus))
            .unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
        assert_eq!(device.pending(), 0);
    }

    #[test]
    fn transport_failure_propagates() {
        let (mut host, _device) = MemoryTransport::pair();
        host.set_fail_writes(true);

        let err = FrameWriter::new()
            .send(&mut host, &Message::command(Command::Homing))
            .unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Io(_))));
    }
}
