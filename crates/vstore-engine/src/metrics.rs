use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-lifetime counters of committed versions.
#[derive(Debug, Default)]
pub struct VStoreMetrics {
    referenced_binaries: AtomicU64,
    object_versions_committed: AtomicU64,
    template_versions_committed: AtomicU64,
}

/// Point-in-time copy of [`VStoreMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub referenced_binaries: u64,
    pub object_versions_committed: u64,
    pub template_versions_committed: u64,
}

impl VStoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a committed object version referencing `binaries` uploads.
    pub fn record_object_commit(&self, binaries: usize) {
        self.object_versions_committed.fetch_add(1, Ordering::Relaxed);
        self.referenced_binaries
            .fetch_add(binaries as u64, Ordering::Relaxed);
    }

    pub fn record_template_commit(&self) {
        self.template_versions_committed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            referenced_binaries: self.referenced_binaries.load(Ordering::Relaxed),
            object_versions_committed: self.object_versions_committed.load(Ordering::Relaxed),
            template_versions_committed: self.template_versions_committed.load(Ordering::Relaxed),
        }
    }
}
