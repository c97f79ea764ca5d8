//! Lease-based mutual exclusion scoped to one template or object id.
//!
//! Every read-modify-write sequence on an entity runs under a [`LockLease`]
//! obtained from a [`LockManager`]. Acquisition never queues: a lease held by
//! another in-flight operation fails fast with [`LockError::AlreadyExists`]
//! and the caller retries later. Leases carry an expiration, so a crashed
//! holder cannot block an entity forever.

pub mod config;
pub mod error;
pub mod lease;
pub mod memory;
pub mod traits;

pub use config::LockConfig;
pub use error::{LockError, LockResult};
pub use lease::{LeaseRelease, LockKey, LockLease, LockScope};
pub use memory::InMemoryLockManager;
pub use traits::LockManager;
