/// Errors that can occur while sending or receiving frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The escaped frame would not fit the destination.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The message could not be serialized.
    #[error("frame payload error: {0}")]
    Message(#[from] koruza_message::MessageError),

    /// The underlying transport failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] koruza_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
