use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vstore_lock::{LockKey, LockManager};
use vstore_store::{ObjectRecord, ObjectStore};
use vstore_types::{
    ContinuationContainer, ElementRecord, ElementValue, IdentifyableRecord, ObjectElementDescriptor,
    ObjectId, ObjectMetadata, ObjectMetadataRecord, ObjectVersionRecord, TemplateCode,
    VersionId, VersionedObjectDescriptor, VersionedObjectRef, VersionedTemplateDescriptor,
};

use crate::error::{VStoreError, VStoreResult};
use crate::templates::reader::{next_continuation_token, parse_continuation_token};
use crate::templates::TemplatesStorageReader;

fn ensure_active(cancel: &CancellationToken) -> VStoreResult<()> {
    if cancel.is_cancelled() {
        return Err(VStoreError::Cancelled);
    }
    Ok(())
}

/// Read side of the object relations. Object reads always hit the store.
pub struct ObjectsStorageReader {
    store: Arc<dyn ObjectStore>,
    templates: Arc<TemplatesStorageReader>,
    locks: Arc<dyn LockManager>,
    list_batch_size: usize,
}

impl ObjectsStorageReader {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        templates: Arc<TemplatesStorageReader>,
        locks: Arc<dyn LockManager>,
        list_batch_size: usize,
    ) -> Self {
        Self {
            store,
            templates,
            locks,
            list_batch_size,
        }
    }

    /// Full descriptor of `version_id`, or of the latest version when omitted.
    pub async fn get_object_descriptor(
        &self,
        id: ObjectId,
        version_id: Option<&VersionId>,
        cancel: &CancellationToken,
    ) -> VStoreResult<VersionedObjectDescriptor> {
        ensure_active(cancel)?;
        let record = self.object_record(id, version_id)?;
        ensure_active(cancel)?;
        self.to_descriptor(record)
    }

    pub async fn get_object_latest_version(
        &self,
        id: ObjectId,
    ) -> VStoreResult<Option<VersionedObjectRef>> {
        Ok(self
            .store
            .latest_object(id)?
            .map(|record| VersionedObjectRef {
                id: record.id,
                version_id: record.version_id,
                last_modified: record.last_modified,
            }))
    }

    pub async fn is_object_exists(&self, id: ObjectId) -> VStoreResult<bool> {
        Ok(self.store.object_exists(id)?)
    }

    /// Version history with element values, newest first, stopping before
    /// `initial_version_id`.
    pub async fn get_object_versions(
        &self,
        id: ObjectId,
        initial_version_id: Option<&VersionId>,
        cancel: &CancellationToken,
    ) -> VStoreResult<Vec<ObjectVersionRecord>> {
        self.versions(id, initial_version_id, true, cancel).await
    }

    /// Like [`get_object_versions`](Self::get_object_versions), without
    /// element values.
    pub async fn get_object_versions_metadata(
        &self,
        id: ObjectId,
        initial_version_id: Option<&VersionId>,
        cancel: &CancellationToken,
    ) -> VStoreResult<Vec<ObjectVersionRecord>> {
        self.versions(id, initial_version_id, false, cancel).await
    }

    /// One page of object ids in ascending order, after `continuation_token`.
    pub async fn list(
        &self,
        continuation_token: Option<&str>,
        cancel: &CancellationToken,
    ) -> VStoreResult<ContinuationContainer<IdentifyableRecord>> {
        ensure_active(cancel)?;
        let after = parse_continuation_token(continuation_token)?;
        let items: Vec<_> = self
            .store
            .list_objects(after, self.list_batch_size)?
            .into_iter()
            .map(|record| IdentifyableRecord {
                id: record.id,
                last_modified: record.last_modified,
            })
            .collect();
        let next = next_continuation_token(&items, continuation_token);
        Ok(ContinuationContainer::new(items, next))
    }

    pub async fn get_objects_metadata(
        &self,
        ids: &[ObjectId],
        cancel: &CancellationToken,
    ) -> VStoreResult<Vec<ObjectMetadataRecord>> {
        ensure_active(cancel)?;
        Ok(self
            .store
            .latest_objects(ids)?
            .into_iter()
            .map(|record| ObjectMetadataRecord {
                id: record.id,
                version_id: record.version_id,
                last_modified: record.last_modified,
                author: record.author,
            })
            .collect())
    }

    /// Template version an object version is pinned to.
    pub async fn get_template_descriptor(
        &self,
        id: ObjectId,
        version_id: &VersionId,
        cancel: &CancellationToken,
    ) -> VStoreResult<Arc<VersionedTemplateDescriptor>> {
        ensure_active(cancel)?;
        let record = self.object_record(id, Some(version_id))?;
        self.templates
            .get_template_descriptor(record.template_id, Some(&record.template_version_id))
    }

    pub async fn get_object_version_last_modified(
        &self,
        id: ObjectId,
        version_id: &VersionId,
    ) -> VStoreResult<DateTime<Utc>> {
        Ok(self.object_record(id, Some(version_id))?.last_modified)
    }

    /// Value of an image element of the given object version.
    pub async fn get_image_element_value(
        &self,
        id: ObjectId,
        version_id: &VersionId,
        template_code: TemplateCode,
        cancel: &CancellationToken,
    ) -> VStoreResult<ElementValue> {
        let descriptor = self.get_object_descriptor(id, Some(version_id), cancel).await?;
        let element = descriptor
            .elements
            .into_iter()
            .find(|e| e.template_code == template_code)
            .ok_or_else(|| {
                VStoreError::NotFound(format!(
                    "element {template_code} of object {id} version {version_id}"
                ))
            })?;
        let actual = element.value.element_type();
        if !actual.is_image() {
            return Err(VStoreError::InvalidElementType {
                template_code,
                expected: "image",
                actual,
            });
        }
        Ok(element.value)
    }

    // ---- shared with the management service ----

    pub(crate) fn object_record(
        &self,
        id: ObjectId,
        version_id: Option<&VersionId>,
    ) -> VStoreResult<ObjectRecord> {
        match version_id {
            Some(version_id) => self.store.object_version(id, version_id)?.ok_or_else(|| {
                VStoreError::NotFound(format!("object {id} version {version_id}"))
            }),
            None => self
                .store
                .latest_object(id)?
                .ok_or_else(|| VStoreError::NotFound(format!("object {id}"))),
        }
    }

    /// Elements of `record`, resolved through its link set.
    pub(crate) fn load_elements(
        &self,
        record: &ObjectRecord,
    ) -> VStoreResult<Vec<ObjectElementDescriptor>> {
        let links = self.store.object_links(record.id, &record.version_id)?;
        let mut elements = Vec::with_capacity(links.len());
        for link in links {
            let row = self
                .store
                .element(link.element_id, &link.element_version_id)?
                .ok_or_else(|| {
                    VStoreError::Internal(format!(
                        "object {} version {} links missing element {} version {}",
                        record.id, record.version_id, link.element_id, link.element_version_id
                    ))
                })?;
            let data = row.descriptor()?;
            elements.push(ObjectElementDescriptor {
                id: row.id,
                template_code: data.template_code,
                properties: data.properties,
                constraints: data.constraints,
                value: data.value,
                version_id: Some(row.version_id),
                last_modified: Some(row.last_modified),
            });
        }
        Ok(elements)
    }

    pub(crate) fn to_descriptor(&self, record: ObjectRecord) -> VStoreResult<VersionedObjectDescriptor> {
        let elements = self.load_elements(&record)?;
        let data = record.descriptor()?;
        debug!(id = record.id, version_id = %record.version_id, "object descriptor loaded");
        Ok(VersionedObjectDescriptor {
            id: record.id,
            version_id: record.version_id,
            version_index: record.version_index,
            last_modified: record.last_modified,
            template_id: record.template_id,
            template_version_id: record.template_version_id,
            language: data.language,
            properties: data.properties,
            elements,
            metadata: ObjectMetadata {
                author: record.author,
                modified_elements: record.modified_elements,
            },
        })
    }

    async fn versions(
        &self,
        id: ObjectId,
        initial_version_id: Option<&VersionId>,
        with_elements: bool,
        cancel: &CancellationToken,
    ) -> VStoreResult<Vec<ObjectVersionRecord>> {
        ensure_active(cancel)?;
        self.locks.ensure_lock_not_exists(LockKey::object(id)).await?;

        let records = self.store.object_versions(id)?;
        if records.is_empty() {
            return Err(VStoreError::NotFound(format!("object {id}")));
        }

        let mut versions = Vec::new();
        for record in records
            .into_iter()
            .take_while(|r| Some(&r.version_id) != initial_version_id)
        {
            ensure_active(cancel)?;
            let elements = if with_elements {
                self.load_elements(&record)?
                    .into_iter()
                    .map(|e| ElementRecord {
                        template_code: e.template_code,
                        value: e.value,
                    })
                    .collect()
            } else {
                Vec::new()
            };
            let data = record.descriptor()?;
            versions.push(ObjectVersionRecord {
                id: record.id,
                version_id: record.version_id,
                version_index: record.version_index,
                template_id: record.template_id,
                template_version_id: record.template_version_id,
                last_modified: record.last_modified,
                author: record.author,
                properties: data.properties,
                elements,
                modified_elements: record.modified_elements,
            });
        }
        Ok(versions)
    }
}

impl fmt::Debug for ObjectsStorageReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectsStorageReader")
            .field("templates", &self.templates)
            .field("list_batch_size", &self.list_batch_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use vstore_types::{ElementType, TextElementValue};

    use super::*;
    use crate::config::VStoreConfig;
    use crate::testing::*;
    use crate::vstore::{InMemoryBackends, VStore};

    async fn store_with_history(
        config: VStoreConfig,
        ids: &[ObjectId],
    ) -> (VStore, InMemoryBackends, Vec<VersionId>) {
        let (store, backends) = VStore::in_memory(config);
        let text = text_element(TEXT_CODE, 20);
        let image = image_element(IMAGE_CODE);
        let template_version = store
            .create_template(1, author(), template(vec![text.clone(), image.clone()]))
            .await
            .unwrap();
        upload(&backends, "upload-1", "logo.png", png(64, 48));

        let mut versions = Vec::new();
        for &id in ids {
            let v0 = store
                .create_object(
                    id,
                    author(),
                    object(
                        1,
                        &template_version,
                        vec![text_value(&text, "first"), image_value(&image, "upload-1")],
                    ),
                )
                .await
                .unwrap();
            let v1 = store
                .modify_object(
                    id,
                    &v0,
                    author(),
                    object(1, &template_version, vec![text_value(&text, "second")]),
                )
                .await
                .unwrap();
            versions.extend([v0, v1]);
        }
        (store, backends, versions)
    }

    fn texts(record: &ObjectVersionRecord) -> Vec<&ElementValue> {
        record
            .elements
            .iter()
            .filter(|e| e.template_code == TEXT_CODE)
            .map(|e| &e.value)
            .collect()
    }

    #[tokio::test]
    async fn versions_are_newest_first_and_stop_at_initial() {
        let (store, _, versions) = store_with_history(VStoreConfig::default(), &[5]).await;
        let cancel = CancellationToken::new();
        let reader = store.object_reader();

        let all = reader.get_object_versions(5, None, &cancel).await.unwrap();
        let ids: Vec<_> = all.iter().map(|v| v.version_id.clone()).collect();
        assert_eq!(ids, vec![versions[1].clone(), versions[0].clone()]);
        assert_eq!(
            texts(&all[0]),
            vec![&ElementValue::PlainText(TextElementValue::new("second"))]
        );
        assert_eq!(all[1].elements.len(), 2);

        let since = reader
            .get_object_versions(5, Some(&versions[0]), &cancel)
            .await
            .unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].version_index, 1);

        let metadata = reader
            .get_object_versions_metadata(5, None, &cancel)
            .await
            .unwrap();
        assert_eq!(metadata.len(), 2);
        assert!(metadata.iter().all(|v| v.elements.is_empty()));
        assert_eq!(metadata[0].modified_elements, vec![TEXT_CODE]);
    }

    #[tokio::test]
    async fn versions_of_unknown_object_are_not_found() {
        let (store, _, _) = store_with_history(VStoreConfig::default(), &[]).await;
        let err = store
            .object_reader()
            .get_object_versions(5, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn versions_are_refused_while_object_is_locked() {
        let (store, backends, _) = store_with_history(VStoreConfig::default(), &[5]).await;
        let _lease = backends.locks.acquire_lock(LockKey::object(5)).await.unwrap();
        let err = store
            .object_reader()
            .get_object_versions_metadata(5, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VStoreError::Locked(_)));
    }

    #[tokio::test]
    async fn cancelled_reads_stop_early() {
        let (store, _, _) = store_with_history(VStoreConfig::default(), &[5]).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let reader = store.object_reader();
        assert!(matches!(
            reader.get_object_descriptor(5, None, &cancel).await,
            Err(VStoreError::Cancelled)
        ));
        assert!(matches!(
            reader.get_object_versions(5, None, &cancel).await,
            Err(VStoreError::Cancelled)
        ));
        assert!(matches!(
            reader.list(None, &cancel).await,
            Err(VStoreError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn list_pages_through_ids() {
        let config = VStoreConfig {
            list_batch_size: 2,
            ..VStoreConfig::default()
        };
        let (store, _, _) = store_with_history(config, &[3, 1, 2]).await;
        let cancel = CancellationToken::new();
        let reader = store.object_reader();

        let first = reader.list(None, &cancel).await.unwrap();
        assert_eq!(first.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(first.continuation_token.as_deref(), Some("2"));

        let second = reader
            .list(first.continuation_token.as_deref(), &cancel)
            .await
            .unwrap();
        assert_eq!(second.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3]);

        let last = reader
            .list(second.continuation_token.as_deref(), &cancel)
            .await
            .unwrap();
        assert!(last.items.is_empty());
        assert_eq!(last.continuation_token, second.continuation_token);

        assert!(matches!(
            reader.list(Some("not-a-number"), &cancel).await,
            Err(VStoreError::InputValidation(_))
        ));
    }

    #[tokio::test]
    async fn metadata_reports_latest_versions_of_known_ids() {
        let (store, _, versions) = store_with_history(VStoreConfig::default(), &[1, 2]).await;
        let mut metadata = store
            .object_reader()
            .get_objects_metadata(&[2, 1, 42], &CancellationToken::new())
            .await
            .unwrap();
        metadata.sort_by_key(|m| m.id);
        let heads: Vec<_> = metadata.iter().map(|m| (m.id, m.version_id.clone())).collect();
        assert_eq!(heads, vec![(1, versions[1].clone()), (2, versions[3].clone())]);
    }

    #[tokio::test]
    async fn object_versions_resolve_their_template() {
        let (store, _, versions) = store_with_history(VStoreConfig::default(), &[5]).await;
        let reader = store.object_reader();
        let template = reader
            .get_template_descriptor(5, &versions[0], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(template.id, 1);
        assert_eq!(template.elements.len(), 2);

        let missing = reader
            .get_template_descriptor(5, &VersionId::new("nope"), &CancellationToken::new())
            .await;
        assert!(matches!(missing, Err(VStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn image_element_lookup() {
        let (store, _, versions) = store_with_history(VStoreConfig::default(), &[5]).await;
        let reader = store.object_reader();
        let cancel = CancellationToken::new();

        let value = reader
            .get_image_element_value(5, &versions[1], IMAGE_CODE, &cancel)
            .await
            .unwrap();
        assert_eq!(value.element_type(), ElementType::BitmapImage);

        assert!(matches!(
            reader
                .get_image_element_value(5, &versions[1], TEXT_CODE, &cancel)
                .await,
            Err(VStoreError::InvalidElementType {
                template_code: TEXT_CODE,
                actual: ElementType::PlainText,
                ..
            })
        ));
        assert!(matches!(
            reader
                .get_image_element_value(5, &versions[1], 999, &cancel)
                .await,
            Err(VStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn latest_version_and_last_modified() {
        let (store, _, versions) = store_with_history(VStoreConfig::default(), &[5]).await;
        let reader = store.object_reader();

        let latest = reader.get_object_latest_version(5).await.unwrap().unwrap();
        assert_eq!(latest.version_id, versions[1]);
        assert!(reader.get_object_latest_version(6).await.unwrap().is_none());
        assert!(reader.is_object_exists(5).await.unwrap());

        let modified = reader
            .get_object_version_last_modified(5, &versions[0])
            .await
            .unwrap();
        assert!(modified <= latest.last_modified);
    }
}
