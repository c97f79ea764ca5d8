use async_trait::async_trait;
use bytes::Bytes;
use vstore_types::BinaryMetadata;

use crate::error::BinaryResult;

/// Resolves file keys to upload metadata and content.
#[async_trait]
pub trait BinaryMetadataResolver: Send + Sync {
    /// Fails with `NotFound` or `SessionExpired` if the key cannot be newly
    /// referenced.
    async fn verify_session_not_expired(&self, key: &str) -> BinaryResult<()>;

    async fn get_metadata(&self, key: &str) -> BinaryResult<BinaryMetadata>;

    async fn get_content(&self, key: &str) -> BinaryResult<Bytes>;
}
