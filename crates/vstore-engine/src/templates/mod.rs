//! Template versioning: the cached read side and the management service.

pub mod reader;
pub mod service;

pub use reader::TemplatesStorageReader;
pub use service::TemplatesManagementService;
