use reqwest::StatusCode;
use thiserror::Error;

/// Coarse failure categories shown to the caller. Every category ends up as the
/// same "no data" message for the user; the variant only decides what gets logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigMissing,
    NetworkOrHttpFailure,
    ParseFailure,
    NoDataAvailable,
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Missing configuration value {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: StatusCode },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Could not read feed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Feed has no {0} element")]
    MissingElement(&'static str),

    #[error("Missing attribute {attribute} on {element}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Attribute {attribute} is not numeric: {value:?}")]
    InvalidNumber {
        attribute: &'static str,
        value: String,
    },
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::ConfigMissing(_) | FeedError::ConfigInvalid(_) => ErrorKind::ConfigMissing,
            FeedError::Status { .. } | FeedError::Network(_) => ErrorKind::NetworkOrHttpFailure,
            FeedError::Io(_)
            | FeedError::Encoding(_)
            | FeedError::Xml(_)
            | FeedError::MissingElement(_)
            | FeedError::MissingAttribute { .. }
            | FeedError::InvalidNumber { .. } => ErrorKind::ParseFailure,
        }
    }
}
