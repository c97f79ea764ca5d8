//! Storage for VStore's four relations.
//!
//! - **templates**: one row per template version, keyed by `(id, version_id)`
//!   and `(id, version_index)`
//! - **objects**: one row per object version, same keys
//! - **object elements**: one row per element version, keyed by
//!   `(element_id, version_id)`
//! - **object element links**: `(object_id, object_version_id) ->
//!   (element_id, element_version_id)`
//!
//! Rows are append-only. A version is written through a single
//! `commit_*_version` call that checks the caller's view of the latest
//! version and applies all rows atomically, or none.

pub mod codec;
pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryObjectStore, InMemoryTemplateStore};
pub use records::{
    ObjectElementLinkRecord, ObjectElementRecord, ObjectRecord, ObjectVersionCommit,
    TemplateRecord, TemplateVersionCommit, VersionHead,
};
pub use traits::{ObjectStore, TemplateStore};
