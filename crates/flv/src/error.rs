use std::io;

use thiserror::Error;

/// Errors raised while reading or remuxing an FLV stream.
#[derive(Debug, Error)]
pub enum FlvError {
    /// The stream does not start with a supported FLV header.
    #[error("not a supported flv stream: {0}")]
    NotSupportedStream(String),

    /// A tag carried a type byte other than audio, video or script data.
    #[error("unknown flv tag type: {0}")]
    UnknownTag(u8),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl FlvError {
    /// Whether the stream ended before a complete field could be read.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, FlvError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

pub type Result<T> = std::result::Result<T, FlvError>;
