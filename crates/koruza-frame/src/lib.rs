//! Escape-delimited framing for the KORUZA serial link.
//!
//! Every message travels in a frame:
//! - A START marker (0xF1)
//! - The serialized message, with any marker byte preceded by ESCAPE (0xF3)
//! - An END marker (0xF2)
//!
//! The decoder resynchronizes on the next START after noise, partial frames
//! or oversized input, so callers only ever see complete, checksummed
//! messages.

pub mod codec;
pub mod error;
pub mod parser;
pub mod reader;
pub mod writer;

pub use codec::{
    encode_frame, frame_message, FrameDecoder, FRAME_MAX_LENGTH, MARKER_END, MARKER_ESCAPE,
    MARKER_START,
};
pub use error::{FrameError, Result};
pub use parser::{FrameParser, FrameStats, MessageHandler, MessageQueue};
pub use reader::FrameReader;
pub use writer::FrameWriter;
