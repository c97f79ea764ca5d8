use crate::lease::LockKey;

/// Errors from lock operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// Another operation holds an unexpired lease on this key.
    #[error("lock already exists for {0}")]
    AlreadyExists(LockKey),

    /// The lock table was poisoned by a panicking holder.
    #[error("lock table poisoned: {0}")]
    Poisoned(String),

    /// Backend failure (transport, timeout, ...).
    #[error("lock backend error: {0}")]
    Backend(String),
}

/// Result alias for lock operations.
pub type LockResult<T> = Result<T, LockError>;
