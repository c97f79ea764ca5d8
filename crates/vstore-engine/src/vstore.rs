use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use vstore_binary::{BinaryMetadataResolver, InMemoryBinaryStorage};
use vstore_events::{EventPublisher, InMemoryEventPublisher};
use vstore_lock::{InMemoryLockManager, LockManager};
use vstore_store::{InMemoryObjectStore, InMemoryTemplateStore, ObjectStore, TemplateStore, VersionHead};
use vstore_types::{
    AuthorInfo, ContinuationContainer, ElementDescriptor, ElementValue, IdentifyableRecord,
    ObjectDescriptor, ObjectId, ObjectMetadataRecord, ObjectVersionRecord, TemplateCode,
    TemplateDescriptor, TemplateId, TemplateVersionRecord, VersionId, VersionedObjectDescriptor,
    VersionedObjectRef, VersionedTemplateDescriptor,
};
use vstore_validation::TemplateChecker;

use crate::config::VStoreConfig;
use crate::error::VStoreResult;
use crate::metrics::{MetricsSnapshot, VStoreMetrics};
use crate::objects::{ObjectsManagementService, ObjectsStorageReader};
use crate::templates::{TemplatesManagementService, TemplatesStorageReader};

/// External collaborators of a [`VStore`].
#[derive(Clone)]
pub struct Backends {
    pub template_store: Arc<dyn TemplateStore>,
    pub object_store: Arc<dyn ObjectStore>,
    pub locks: Arc<dyn LockManager>,
    pub binaries: Arc<dyn BinaryMetadataResolver>,
    pub events: Arc<dyn EventPublisher>,
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

/// In-process backends, kept as concrete handles so callers can register
/// uploads, subscribe to events or count rows.
#[derive(Clone, Debug)]
pub struct InMemoryBackends {
    pub template_store: Arc<InMemoryTemplateStore>,
    pub object_store: Arc<InMemoryObjectStore>,
    pub locks: Arc<InMemoryLockManager>,
    pub binaries: Arc<InMemoryBinaryStorage>,
    pub events: Arc<InMemoryEventPublisher>,
}

impl InMemoryBackends {
    pub fn new(config: &VStoreConfig) -> Self {
        Self {
            template_store: Arc::new(InMemoryTemplateStore::new()),
            object_store: Arc::new(InMemoryObjectStore::new()),
            locks: Arc::new(InMemoryLockManager::new(&config.lock)),
            binaries: Arc::new(InMemoryBinaryStorage::new()),
            events: Arc::new(InMemoryEventPublisher::new()),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            template_store: self.template_store.clone(),
            object_store: self.object_store.clone(),
            locks: self.locks.clone(),
            binaries: self.binaries.clone(),
            events: self.events.clone(),
        }
    }
}

/// Versioned template and object store.
///
/// Owns the readers and management services and wires them to one set of
/// [`Backends`].
pub struct VStore {
    config: VStoreConfig,
    templates: TemplatesManagementService,
    template_reader: Arc<TemplatesStorageReader>,
    objects: ObjectsManagementService,
    object_reader: Arc<ObjectsStorageReader>,
    metrics: Arc<VStoreMetrics>,
}

impl VStore {
    pub fn new(config: VStoreConfig, backends: Backends) -> Self {
        let metrics = Arc::new(VStoreMetrics::new());
        let template_reader = Arc::new(TemplatesStorageReader::new(
            Arc::clone(&backends.template_store),
            config.list_batch_size,
        ));
        let object_reader = Arc::new(ObjectsStorageReader::new(
            Arc::clone(&backends.object_store),
            Arc::clone(&template_reader),
            Arc::clone(&backends.locks),
            config.list_batch_size,
        ));
        let templates = TemplatesManagementService::new(
            Arc::clone(&backends.template_store),
            Arc::clone(&backends.locks),
            TemplateChecker::new(config.max_binary_size),
            Arc::clone(&metrics),
        );
        let objects = ObjectsManagementService::new(
            &backends,
            Arc::clone(&template_reader),
            Arc::clone(&object_reader),
            Arc::clone(&metrics),
            &config,
        );
        Self {
            config,
            templates,
            template_reader,
            objects,
            object_reader,
            metrics,
        }
    }

    /// A store over fresh in-memory backends.
    pub fn in_memory(config: VStoreConfig) -> (Self, InMemoryBackends) {
        let backends = InMemoryBackends::new(&config);
        (Self::new(config, backends.backends()), backends)
    }

    pub fn config(&self) -> &VStoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn template_reader(&self) -> &TemplatesStorageReader {
        &self.template_reader
    }

    pub fn object_reader(&self) -> &ObjectsStorageReader {
        &self.object_reader
    }

    // ---- Template operations ----

    pub async fn create_template(
        &self,
        id: TemplateId,
        author: AuthorInfo,
        descriptor: TemplateDescriptor,
    ) -> VStoreResult<VersionId> {
        self.templates.create_template(id, author, descriptor).await
    }

    pub async fn modify_template(
        &self,
        id: TemplateId,
        version_id: &VersionId,
        author: AuthorInfo,
        descriptor: TemplateDescriptor,
    ) -> VStoreResult<VersionId> {
        self.templates
            .modify_template(id, version_id, author, descriptor)
            .await
    }

    pub fn available_element_descriptors(&self) -> Vec<ElementDescriptor> {
        self.templates.available_element_descriptors()
    }

    pub fn get_template_descriptor(
        &self,
        id: TemplateId,
        version_id: Option<&VersionId>,
    ) -> VStoreResult<Arc<VersionedTemplateDescriptor>> {
        self.template_reader.get_template_descriptor(id, version_id)
    }

    pub fn get_template_latest_version(&self, id: TemplateId) -> VStoreResult<VersionHead> {
        self.template_reader.get_template_latest_version(id)
    }

    pub fn is_template_exists(&self, id: TemplateId) -> VStoreResult<bool> {
        self.template_reader.is_template_exists(id)
    }

    pub fn get_template_versions(&self, id: TemplateId) -> VStoreResult<Vec<TemplateVersionRecord>> {
        self.template_reader.get_template_versions(id)
    }

    pub fn list_templates(
        &self,
        continuation_token: Option<&str>,
    ) -> VStoreResult<ContinuationContainer<IdentifyableRecord>> {
        self.template_reader.list(continuation_token)
    }

    pub fn get_templates_metadata(
        &self,
        ids: &[TemplateId],
    ) -> VStoreResult<Vec<ObjectMetadataRecord>> {
        self.template_reader.get_templates_metadata(ids)
    }

    // ---- Object operations ----

    pub async fn create_object(
        &self,
        id: ObjectId,
        author: AuthorInfo,
        descriptor: ObjectDescriptor,
    ) -> VStoreResult<VersionId> {
        self.objects.create(id, author, descriptor).await
    }

    pub async fn modify_object(
        &self,
        id: ObjectId,
        version_id: &VersionId,
        author: AuthorInfo,
        descriptor: ObjectDescriptor,
    ) -> VStoreResult<VersionId> {
        self.objects.modify(id, version_id, author, descriptor).await
    }

    pub async fn upgrade_object(
        &self,
        id: ObjectId,
        version_id: &VersionId,
        author: AuthorInfo,
        modified_template_codes: Vec<TemplateCode>,
        descriptor: ObjectDescriptor,
    ) -> VStoreResult<VersionId> {
        self.objects
            .upgrade(id, version_id, author, modified_template_codes, descriptor)
            .await
    }

    pub async fn get_object_descriptor(
        &self,
        id: ObjectId,
        version_id: Option<&VersionId>,
        cancel: &CancellationToken,
    ) -> VStoreResult<VersionedObjectDescriptor> {
        self.object_reader
            .get_object_descriptor(id, version_id, cancel)
            .await
    }

    pub async fn get_object_latest_version(
        &self,
        id: ObjectId,
    ) -> VStoreResult<Option<VersionedObjectRef>> {
        self.object_reader.get_object_latest_version(id).await
    }

    pub async fn is_object_exists(&self, id: ObjectId) -> VStoreResult<bool> {
        self.object_reader.is_object_exists(id).await
    }

    pub async fn get_object_versions(
        &self,
        id: ObjectId,
        initial_version_id: Option<&VersionId>,
        cancel: &CancellationToken,
    ) -> VStoreResult<Vec<ObjectVersionRecord>> {
        self.object_reader
            .get_object_versions(id, initial_version_id, cancel)
            .await
    }

    pub async fn get_object_versions_metadata(
        &self,
        id: ObjectId,
        initial_version_id: Option<&VersionId>,
        cancel: &CancellationToken,
    ) -> VStoreResult<Vec<ObjectVersionRecord>> {
        self.object_reader
            .get_object_versions_metadata(id, initial_version_id, cancel)
            .await
    }

    pub async fn list_objects(
        &self,
        continuation_token: Option<&str>,
        cancel: &CancellationToken,
    ) -> VStoreResult<ContinuationContainer<IdentifyableRecord>> {
        self.object_reader.list(continuation_token, cancel).await
    }

    pub async fn get_objects_metadata(
        &self,
        ids: &[ObjectId],
        cancel: &CancellationToken,
    ) -> VStoreResult<Vec<ObjectMetadataRecord>> {
        self.object_reader.get_objects_metadata(ids, cancel).await
    }

    pub async fn get_object_template_descriptor(
        &self,
        id: ObjectId,
        version_id: &VersionId,
        cancel: &CancellationToken,
    ) -> VStoreResult<Arc<VersionedTemplateDescriptor>> {
        self.object_reader
            .get_template_descriptor(id, version_id, cancel)
            .await
    }

    pub async fn get_object_version_last_modified(
        &self,
        id: ObjectId,
        version_id: &VersionId,
    ) -> VStoreResult<DateTime<Utc>> {
        self.object_reader
            .get_object_version_last_modified(id, version_id)
            .await
    }

    pub async fn get_image_element_value(
        &self,
        id: ObjectId,
        version_id: &VersionId,
        template_code: TemplateCode,
        cancel: &CancellationToken,
    ) -> VStoreResult<ElementValue> {
        self.object_reader
            .get_image_element_value(id, version_id, template_code, cancel)
            .await
    }
}

impl fmt::Debug for VStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VStore")
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}
