//! Object versioning: the read side, binary resolution, link computation and
//! the management service that writes new versions.

pub mod binaries;
pub mod persistence;
pub mod preprocess;
pub mod reader;
pub mod service;

pub use binaries::{resolve_binaries, validate_binaries, BinaryResolution, ResolvedBinaries};
pub use persistence::compute_links;
pub use reader::ObjectsStorageReader;
pub use service::ObjectsManagementService;
