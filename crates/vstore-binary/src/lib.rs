//! Binary metadata resolution.
//!
//! Binary-bearing element values reference uploads by opaque file keys. The
//! upload subsystem that produces those keys lives outside VStore; this crate
//! defines the [`BinaryMetadataResolver`] boundary to it and an in-memory
//! implementation for tests and embedding.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{BinaryError, BinaryResult};
pub use memory::InMemoryBinaryStorage;
pub use traits::BinaryMetadataResolver;
