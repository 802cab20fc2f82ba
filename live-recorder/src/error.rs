//! Application-wide error types.

use flv::FlvError;
use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Not a supported stream: {0}")]
    NotSupportedStream(String),

    #[error("Unknown FLV tag type: {0}")]
    UnknownTag(u8),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Live source error: {0}")]
    Live(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn already_exists(kind: &'static str, id: impl ToString) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.to_string(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

impl From<FlvError> for Error {
    fn from(err: FlvError) -> Self {
        match err {
            FlvError::NotSupportedStream(reason) => Self::NotSupportedStream(reason),
            FlvError::UnknownTag(tag_type) => Self::UnknownTag(tag_type),
            FlvError::Io(e) => Self::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flv_errors_map_onto_variants() {
        let err: Error = FlvError::UnknownTag(3).into();
        assert!(matches!(err, Error::UnknownTag(3)));

        let err: Error = FlvError::NotSupportedStream("bad magic".into()).into();
        assert!(matches!(err, Error::NotSupportedStream(reason) if reason == "bad magic"));
    }

    #[test]
    fn test_predicates() {
        assert!(Error::not_found("listener", "a").is_not_found());
        assert!(Error::already_exists("recorder", "a").is_already_exists());
        assert!(!Error::Other("x".into()).is_not_found());
        assert_eq!(
            Error::already_exists("listener", "room-1").to_string(),
            "listener already exists: room-1"
        );
    }
}
