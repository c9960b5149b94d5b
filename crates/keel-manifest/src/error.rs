//! Error types for Keel manifests.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The document is not a well-formed manifest.
    #[error("Invalid manifest document: {0}")]
    Decode(String),

    /// The document is well-formed but breaks a manifest rule.
    #[error("Manifest validation failed: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
