/// Errors that can occur while building or parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// A field header or value runs past the end of the buffer.
    #[error("truncated field at offset {offset}")]
    Truncated { offset: usize },

    /// The buffer ended without a checksum field.
    #[error("message has no checksum field")]
    MissingChecksum,

    /// The checksum field has the wrong value length.
    #[error("invalid checksum length {0} (expected 4)")]
    InvalidChecksumLength(u16),

    /// The transmitted checksum does not match the message contents.
    #[error("checksum mismatch (expected {expected:#010x}, computed {actual:#010x})")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// A field value does not fit the 2-byte length prefix.
    #[error("value for tag {tag} too long ({len} bytes, max 65535)")]
    ValueTooLong { tag: u8, len: usize },

    /// The serialized message does not fit the destination.
    #[error("message needs {size} bytes, buffer holds {capacity}")]
    BufferTooSmall { size: usize, capacity: usize },

    /// The tag is managed by the codec and cannot be added by hand.
    #[error("tag {0} is reserved")]
    ReservedTag(u8),
}

pub type Result<T> = std::result::Result<T, MessageError>;
