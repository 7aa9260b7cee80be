use bytes::{BufMut, Bytes, BytesMut};
use koruza_message::Message;
use tracing::debug;

use crate::error::{FrameError, Result};

/// Marks the beginning of a frame.
pub const MARKER_START: u8 = 0xF1;

/// Marks the end of a frame.
pub const MARKER_END: u8 = 0xF2;

/// Precedes any payload byte that collides with a marker.
pub const MARKER_ESCAPE: u8 = 0xF3;

/// Maximum frame size in bytes, both on the wire and after unescaping.
pub const FRAME_MAX_LENGTH: usize = 131_070;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

fn is_marker(byte: u8) -> bool {
    matches!(byte, MARKER_START | MARKER_END | MARKER_ESCAPE)
}

/// Escape `payload` and wrap it in START/END markers.
///
/// Wire format:
/// ```text
/// ┌───────┬──────────────────────────────────────┬───────┐
/// │ START │ payload, markers sent as ESCAPE+byte │ END   │
/// │ 0xF1  │                                      │ 0xF2  │
/// └───────┴──────────────────────────────────────┴───────┘
/// ```
///
/// Nothing is written to `dst` when the frame would exceed `capacity` or
/// [`FRAME_MAX_LENGTH`].
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut, capacity: usize) -> Result<()> {
    let escapes = payload.iter().filter(|b| is_marker(**b)).count();
    let size = payload.len() + escapes + 2;
    let max = capacity.min(FRAME_MAX_LENGTH);
    if size > max {
        return Err(FrameError::FrameTooLarge { size, max });
    }

    dst.reserve(size);
    dst.put_u8(MARKER_START);
    for &byte in payload {
        if is_marker(byte) {
            dst.put_u8(MARKER_ESCAPE);
        }
        dst.put_u8(byte);
    }
    dst.put_u8(MARKER_END);
    Ok(())
}

/// Serialize `message` (with checksum) and frame it.
pub fn frame_message(message: &Message, capacity: usize) -> Result<Bytes> {
    let payload = message.serialize();
    let mut dst = BytesMut::new();
    encode_frame(&payload, &mut dst, capacity)?;
    Ok(dst.freeze())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    WaitStart,
    WaitStartEscape,
    InFrame,
    AfterEscape,
}

/// Byte-at-a-time frame decoder.
///
/// Emits the unescaped payload of every complete, non-empty frame. Feeding a
/// buffer is exactly equivalent to feeding its bytes one by one, so results
/// never depend on how the stream was chunked.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    buf: BytesMut,
    max_length: usize,
    oversized: u64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder accepting frames up to [`FRAME_MAX_LENGTH`].
    pub fn new() -> Self {
        Self::with_max_length(FRAME_MAX_LENGTH)
    }

    /// Create a decoder with an explicit payload limit.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            state: DecoderState::WaitStart,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY.min(max_length)),
            max_length,
            oversized: 0,
        }
    }

    /// Push one byte. Returns a payload when this byte completed a frame.
    pub fn push_byte(&mut self, byte: u8) -> Option<Bytes> {
        match self.state {
            DecoderState::WaitStart => {
                match byte {
                    MARKER_START => {
                        self.buf.clear();
                        self.state = DecoderState::InFrame;
                    }
                    MARKER_ESCAPE => self.state = DecoderState::WaitStartEscape,
                    _ => {}
                }
                None
            }
            DecoderState::WaitStartEscape => {
                self.state = DecoderState::WaitStart;
                None
            }
            DecoderState::InFrame => match byte {
                MARKER_ESCAPE => {
                    self.state = DecoderState::AfterEscape;
                    None
                }
                MARKER_END => {
                    self.state = DecoderState::WaitStart;
                    if self.buf.is_empty() {
                        None
                    } else {
                        Some(self.buf.split().freeze())
                    }
                }
                _ => {
                    self.append(byte);
                    None
                }
            },
            DecoderState::AfterEscape => {
                self.state = DecoderState::InFrame;
                self.append(byte);
                None
            }
        }
    }

    /// Push a buffer, invoking `on_frame` for every completed payload.
    pub fn push_buffer(&mut self, data: &[u8], mut on_frame: impl FnMut(Bytes)) {
        for &byte in data {
            if let Some(payload) = self.push_byte(byte) {
                on_frame(payload);
            }
        }
    }

    fn append(&mut self, byte: u8) {
        self.buf.put_u8(byte);
        if self.buf.len() > self.max_length {
            debug!(max = self.max_length, "dropping oversized frame");
            self.buf.clear();
            self.state = DecoderState::WaitStart;
            self.oversized += 1;
        }
    }

    /// Number of frames dropped for exceeding the length limit.
    pub fn oversized(&self) -> u64 {
        self.oversized
    }

    /// Whether the decoder is between frames.
    pub fn is_idle(&self) -> bool {
        matches!(
            self.state,
            DecoderState::WaitStart | DecoderState::WaitStartEscape
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use koruza_message::{Command, MotorPosition};

    fn collect(decoder: &mut FrameDecoder, data: &[u8]) -> Vec<Bytes> {
        let mut out = Vec::new();
        decoder.push_buffer(data, |payload| out.push(payload));
        out
    }

    #[test]
    fn encode_plain_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"abc", &mut buf, usize::MAX).unwrap();
        assert_eq!(buf.as_ref(), &[MARKER_START, b'a', b'b', b'c', MARKER_END]);
    }

    #[test]
    fn encode_escapes_every_marker() {
        let mut buf = BytesMut::new();
        encode_frame(&[MARKER_START, 0x00, MARKER_END, MARKER_ESCAPE], &mut buf, usize::MAX)
            .unwrap();
        assert_eq!(
            buf.as_ref(),
            &[
                MARKER_START,
                MARKER_ESCAPE,
                MARKER_START,
                0x00,
                MARKER_ESCAPE,
                MARKER_END,
                MARKER_ESCAPE,
                MARKER_ESCAPE,
                MARKER_END
            ]
        );
    }

    #[test]
    fn encode_respects_capacity() {
        let mut buf = BytesMut::new();
        // 3 bytes + 1 escape + 2 markers = 6
        let payload = [0x01, MARKER_END, 0x02];
        let err = encode_frame(&payload, &mut buf, 5).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 6, max: 5 }));
        assert!(buf.is_empty());

        encode_frame(&payload, &mut buf, 6).unwrap();
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn encode_respects_max_frame_length() {
        let payload = vec![0u8; FRAME_MAX_LENGTH];
        let mut buf = BytesMut::new();
        let err = encode_frame(&payload, &mut buf, usize::MAX).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { max: FRAME_MAX_LENGTH, .. }));
    }

    #[test]
    fn decode_roundtrip_with_escapes() {
        let payload = [MARKER_ESCAPE, 0x10, MARKER_START, MARKER_END, 0xFF];
        let mut buf = BytesMut::new();
        encode_frame(&payload, &mut buf, usize::MAX).unwrap();

        let mut decoder = FrameDecoder::new();
        let frames = collect(&mut decoder, &buf);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), &payload);
        assert!(decoder.is_idle());
    }

    #[test]
    fn byte_by_byte_matches_batch() {
        let mut msg = koruza_message::Message::command(Command::MoveMotor);
        msg.add_motor_position(&MotorPosition::new(-15, 0xF1F2, -3));
        let wire = frame_message(&msg, usize::MAX).unwrap();

        let mut batch = FrameDecoder::new();
        let batch_frames = collect(&mut batch, &wire);

        let mut single = FrameDecoder::new();
        let mut single_frames = Vec::new();
        for &byte in wire.iter() {
            single_frames.extend(single.push_byte(byte));
        }

        assert_eq!(batch_frames, single_frames);
        assert_eq!(batch_frames.len(), 1);
    }

    #[test]
    fn noise_before_start_is_discarded() {
        let mut wire = vec![0x10, 0x20, MARKER_END, 0x33];
        let mut buf = BytesMut::new();
        encode_frame(b"ok", &mut buf, usize::MAX).unwrap();
        wire.extend_from_slice(&buf);

        let mut decoder = FrameDecoder::new();
        let frames = collect(&mut decoder, &wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), b"ok");
    }

    #[test]
    fn stray_escape_swallows_following_byte() {
        // ESCAPE+START outside a frame is noise; the frame that follows the
        // next START still decodes.
        let mut decoder = FrameDecoder::new();
        let frames = collect(
            &mut decoder,
            &[MARKER_ESCAPE, MARKER_START, 0x15, MARKER_END, MARKER_START, 0x42, MARKER_END],
        );
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), &[0x42]);
    }

    #[test]
    fn empty_frame_is_skipped() {
        let mut decoder = FrameDecoder::new();
        let frames = collect(&mut decoder, &[MARKER_START, MARKER_END]);
        assert!(frames.is_empty());
        assert!(decoder.is_idle());
    }

    #[test]
    fn partial_frame_completes_across_pushes() {
        let mut decoder = FrameDecoder::new();
        assert!(collect(&mut decoder, &[MARKER_START, 0x01, MARKER_ESCAPE]).is_empty());
        assert!(!decoder.is_idle());
        let frames = collect(&mut decoder, &[MARKER_END, 0x02, MARKER_END]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), &[0x01, MARKER_END, 0x02]);
    }

    #[test]
    fn oversized_frame_is_dropped_and_decoder_resyncs() {
        let mut decoder = FrameDecoder::with_max_length(4);
        let mut wire = vec![MARKER_START, 1, 2, 3, 4, 5, 6, MARKER_END];
        wire.extend_from_slice(&[MARKER_START, 9, MARKER_END]);

        let frames = collect(&mut decoder, &wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), &[9]);
        assert_eq!(decoder.oversized(), 1);
    }

    #[test]
    fn back_to_back_frames() {
        let mut wire = BytesMut::new();
        encode_frame(b"one", &mut wire, usize::MAX).unwrap();
        encode_frame(b"two", &mut wire, usize::MAX).unwrap();

        let mut decoder = FrameDecoder::new();
        let frames = collect(&mut decoder, &wire);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref(), b"one");
        assert_eq!(frames[1].as_ref(), b"two");
    }
}
