use chrono::{DateTime, Utc};

/// Errors from binary resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BinaryError {
    /// No upload is known under this key.
    #[error("binary not found: {0}")]
    NotFound(String),

    /// The upload session that produced this key has expired.
    #[error("upload session for {key} expired at {expired_at}")]
    SessionExpired {
        key: String,
        expired_at: DateTime<Utc>,
    },

    /// Backend failure.
    #[error("binary storage error: {0}")]
    Storage(String),
}

impl BinaryError {
    /// Whether the key should be reported as a missing binary.
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            BinaryError::NotFound(_) | BinaryError::SessionExpired { .. }
        )
    }
}

/// Result alias for binary resolution.
pub type BinaryResult<T> = Result<T, BinaryError>;
