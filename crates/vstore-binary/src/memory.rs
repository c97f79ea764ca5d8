use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use vstore_types::BinaryMetadata;

use crate::error::{BinaryError, BinaryResult};
use crate::traits::BinaryMetadataResolver;

struct Upload {
    metadata: BinaryMetadata,
    content: Bytes,
    session_expires_at: DateTime<Utc>,
}

/// In-memory upload registry.
///
/// Intended for tests and embedding. Each upload records the expiry of the
/// session that produced it.
pub struct InMemoryBinaryStorage {
    uploads: RwLock<HashMap<String, Upload>>,
}

impl InMemoryBinaryStorage {
    pub fn new() -> Self {
        Self {
            uploads: RwLock::new(HashMap::new()),
        }
    }

    /// Register an upload whose session stays open for `session_ttl`.
    pub fn register_upload(
        &self,
        key: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
        session_ttl: Duration,
    ) -> BinaryResult<()> {
        self.register_upload_until(key, filename, content_type, content, Utc::now() + session_ttl)
    }

    /// Register an upload whose session expires at `session_expires_at`.
    pub fn register_upload_until(
        &self,
        key: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
        session_expires_at: DateTime<Utc>,
    ) -> BinaryResult<()> {
        let key = key.into();
        let content = content.into();
        let metadata = BinaryMetadata::new(filename, content.len() as u64, content_type);
        debug!(%key, filename = %metadata.filename, size = metadata.file_size, "upload registered");
        let mut map = self
            .uploads
            .write()
            .map_err(|_| BinaryError::Storage("upload table poisoned".into()))?;
        map.insert(
            key,
            Upload {
                metadata,
                content,
                session_expires_at,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.uploads.read().map(|map| map.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_upload<T>(&self, key: &str, f: impl FnOnce(&Upload) -> T) -> BinaryResult<T> {
        let map = self
            .uploads
            .read()
            .map_err(|_| BinaryError::Storage("upload table poisoned".into()))?;
        map.get(key)
            .map(f)
            .ok_or_else(|| BinaryError::NotFound(key.to_string()))
    }
}

impl Default for InMemoryBinaryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryBinaryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBinaryStorage")
            .field("uploads", &self.len())
            .finish()
    }
}

#[async_trait]
impl BinaryMetadataResolver for InMemoryBinaryStorage {
    async fn verify_session_not_expired(&self, key: &str) -> BinaryResult<()> {
        let expires_at = self.with_upload(key, |upload| upload.session_expires_at)?;
        if expires_at <= Utc::now() {
            return Err(BinaryError::SessionExpired {
                key: key.to_string(),
                expired_at: expires_at,
            });
        }
        Ok(())
    }

    async fn get_metadata(&self, key: &str) -> BinaryResult<BinaryMetadata> {
        self.with_upload(key, |upload| upload.metadata.clone())
    }

    async fn get_content(&self, key: &str) -> BinaryResult<Bytes> {
        self.with_upload(key, |upload| upload.content.clone())
    }
}
