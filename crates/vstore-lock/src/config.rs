use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lease settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Seconds after which an unreleased lease is considered abandoned.
    pub expiration_secs: u64,
}

impl LockConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            expiration_secs: 60,
        }
    }
}
