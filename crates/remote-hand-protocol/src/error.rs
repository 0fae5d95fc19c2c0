//! Protocol and transport errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to listen on {address}: {reason}")]
    Listen { address: String, reason: String },

    #[error("connection closed by peer")]
    Closed,

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialisation error: {0}")]
    Serialization(String),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("frame of {len} bytes exceeds maximum {max}")]
    FrameTooLarge { len: u32, max: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProtocolError {
    /// Whether the connection is unusable after this error.
    ///
    /// Malformed and oversized frames are consumed whole, so the stream stays
    /// in sync and the next frame can still be read.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Malformed(_) | Self::FrameTooLarge { .. } | Self::Serialization(_)
        )
    }
}
