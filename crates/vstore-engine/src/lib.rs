//! VStore engine: versioned templates and objects.
//!
//! Every mutation runs under a per-entity lease, checks the caller's view of
//! the latest version and writes a new version in one commit:
//!
//! 1. input checks, before any lock or read
//! 2. lease acquisition (fails fast with [`VStoreError::Locked`])
//! 3. optimistic version check ([`VStoreError::Concurrency`])
//! 4. shape checks against the template ([`VStoreError::Inconsistent`])
//! 5. content rules and binary checks, fanned out and fully aggregated
//!    ([`VStoreError::InvalidObject`])
//! 6. creating event, then the atomic commit of element rows, links and the
//!    object row
//!
//! Unchanged elements are shared between consecutive object versions through
//! the link relation, so each version only writes the elements it changes.

pub mod config;
pub mod consistency;
pub mod error;
pub mod metrics;
pub mod objects;
pub mod templates;
pub mod vstore;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, VStoreConfig};
pub use consistency::ensure_elements_state;
pub use error::{VStoreError, VStoreResult};
pub use metrics::{MetricsSnapshot, VStoreMetrics};
pub use objects::{ObjectsManagementService, ObjectsStorageReader};
pub use templates::{TemplatesManagementService, TemplatesStorageReader};
pub use vstore::{Backends, InMemoryBackends, VStore};
