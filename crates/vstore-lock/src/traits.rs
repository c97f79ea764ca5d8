use async_trait::async_trait;

use crate::error::LockResult;
use crate::lease::{LockKey, LockLease};

/// Grants per-entity leases.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Take the lease for `key`, failing fast with
    /// [`LockError::AlreadyExists`](crate::LockError::AlreadyExists) if it is
    /// held. The lease is released when the returned guard is dropped.
    async fn acquire_lock(&self, key: LockKey) -> LockResult<LockLease>;

    /// Succeeds only if nobody currently holds the lease for `key`.
    async fn ensure_lock_not_exists(&self, key: LockKey) -> LockResult<()>;
}
