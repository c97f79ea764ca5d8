use vstore_types::VersionId;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The commit was prepared against a version that is no longer latest.
    #[error("version conflict for {id}: expected latest {expected:?}, found {actual:?}")]
    Conflict {
        id: i64,
        expected: Option<VersionId>,
        actual: Option<VersionId>,
    },

    /// A uniqueness constraint would be violated.
    #[error("duplicate row for {id}: {reason}")]
    Duplicate { id: i64, reason: String },

    /// The commit's rows do not form a consistent version.
    #[error("invalid commit for {id}: {reason}")]
    InvalidCommit { id: i64, reason: String },

    /// Serialization or deserialization of row data failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The in-process table lock was poisoned.
    #[error("store lock poisoned")]
    Poisoned,

    /// Backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
