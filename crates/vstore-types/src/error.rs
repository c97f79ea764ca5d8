use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("unknown element type: {0}")]
    UnknownElementType(String),

    #[error("unknown file format: {0}")]
    UnknownFileFormat(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
