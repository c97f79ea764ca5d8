use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::config::LockConfig;
use crate::error::{LockError, LockResult};
use crate::lease::{LeaseRelease, LockKey, LockLease};
use crate::traits::LockManager;

struct Lease {
    token: String,
    expires_at: Instant,
}

#[derive(Default)]
struct LeaseTable {
    leases: Mutex<HashMap<LockKey, Lease>>,
}

impl LeaseTable {
    fn is_held(map: &HashMap<LockKey, Lease>, key: &LockKey, now: Instant) -> bool {
        map.get(key).is_some_and(|lease| lease.expires_at > now)
    }
}

impl LeaseRelease for LeaseTable {
    fn release(&self, key: LockKey, token: &str) {
        let Ok(mut map) = self.leases.lock() else {
            return;
        };
        if map.get(&key).is_some_and(|lease| lease.token == token) {
            map.remove(&key);
            debug!(%key, "lease released");
        }
    }
}

/// In-process lease manager.
///
/// Intended for tests and single-process deployments. Leases live in a
/// `Mutex<HashMap>`; an expired lease is treated as absent and replaced on the
/// next acquisition.
pub struct InMemoryLockManager {
    table: Arc<LeaseTable>,
    expiration: Duration,
}

impl InMemoryLockManager {
    pub fn new(config: &LockConfig) -> Self {
        Self::with_expiration(config.expiration())
    }

    pub fn with_expiration(expiration: Duration) -> Self {
        Self {
            table: Arc::new(LeaseTable::default()),
            expiration,
        }
    }

    /// Number of unexpired leases.
    pub fn active_leases(&self) -> LockResult<usize> {
        let now = Instant::now();
        let map = self
            .table
            .leases
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        Ok(map.values().filter(|lease| lease.expires_at > now).count())
    }
}

impl Default for InMemoryLockManager {
    fn default() -> Self {
        Self::new(&LockConfig::default())
    }
}

impl fmt::Debug for InMemoryLockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryLockManager")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn acquire_lock(&self, key: LockKey) -> LockResult<LockLease> {
        let now = Instant::now();
        let token = uuid::Uuid::now_v7().simple().to_string();
        {
            let mut map = self
                .table
                .leases
                .lock()
                .map_err(|e| LockError::Poisoned(e.to_string()))?;
            if LeaseTable::is_held(&map, &key, now) {
                debug!(%key, "lease is held");
                return Err(LockError::AlreadyExists(key));
            }
            map.insert(
                key,
                Lease {
                    token: token.clone(),
                    expires_at: now + self.expiration,
                },
            );
        }
        debug!(%key, "lease acquired");
        let releaser: Arc<dyn LeaseRelease> = self.table.clone();
        Ok(LockLease::new(key, token, releaser))
    }

    async fn ensure_lock_not_exists(&self, key: LockKey) -> LockResult<()> {
        let map = self
            .table
            .leases
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        if LeaseTable::is_held(&map, &key, Instant::now()) {
            return Err(LockError::AlreadyExists(key));
        }
        Ok(())
    }
}
