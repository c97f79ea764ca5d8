use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;
use vstore_store::{TemplateRecord, TemplateStore, VersionHead};
use vstore_types::{
    ContinuationContainer, IdentifyableRecord, ObjectMetadataRecord, TemplateId,
    TemplateVersionRecord, VersionId, VersionedTemplateDescriptor,
};

use crate::error::{VStoreError, VStoreResult};

type CacheKey = (TemplateId, VersionId);

/// Read side of the template relation.
///
/// Template versions never change once written, so descriptors are cached
/// by `(id, version_id)` for the life of the reader.
pub struct TemplatesStorageReader {
    store: Arc<dyn TemplateStore>,
    cache: RwLock<HashMap<CacheKey, Arc<VersionedTemplateDescriptor>>>,
    list_batch_size: usize,
}

impl TemplatesStorageReader {
    pub fn new(store: Arc<dyn TemplateStore>, list_batch_size: usize) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
            list_batch_size,
        }
    }

    /// Descriptor of `version_id`, or of the latest version when omitted.
    pub fn get_template_descriptor(
        &self,
        id: TemplateId,
        version_id: Option<&VersionId>,
    ) -> VStoreResult<Arc<VersionedTemplateDescriptor>> {
        if let Some(version_id) = version_id {
            if let Some(cached) = self.cached(id, version_id)? {
                return Ok(cached);
            }
        }

        let record = match version_id {
            Some(version_id) => self.store.template_version(id, version_id)?,
            None => self.store.latest_template(id)?,
        }
        .ok_or_else(|| match version_id {
            Some(version_id) => {
                VStoreError::NotFound(format!("template {id} version {version_id}"))
            }
            None => VStoreError::NotFound(format!("template {id}")),
        })?;

        if let Some(cached) = self.cached(id, &record.version_id)? {
            return Ok(cached);
        }
        let descriptor = Arc::new(to_descriptor(&record)?);
        let mut cache = self
            .cache
            .write()
            .map_err(|_| VStoreError::Internal("template cache poisoned".into()))?;
        let entry = cache
            .entry((id, record.version_id.clone()))
            .or_insert(descriptor);
        debug!(id, version_id = %record.version_id, "template descriptor cached");
        Ok(Arc::clone(entry))
    }

    pub fn get_template_latest_version(&self, id: TemplateId) -> VStoreResult<VersionHead> {
        self.store
            .latest_template(id)?
            .map(|record| record.head())
            .ok_or_else(|| VStoreError::NotFound(format!("template {id}")))
    }

    pub fn is_template_exists(&self, id: TemplateId) -> VStoreResult<bool> {
        Ok(self.store.template_exists(id)?)
    }

    /// Version history, newest first.
    pub fn get_template_versions(&self, id: TemplateId) -> VStoreResult<Vec<TemplateVersionRecord>> {
        let records = self.store.template_versions(id)?;
        if records.is_empty() {
            return Err(VStoreError::NotFound(format!("template {id}")));
        }
        records
            .into_iter()
            .map(|record| -> VStoreResult<TemplateVersionRecord> {
                let descriptor = record.descriptor()?;
                Ok(TemplateVersionRecord {
                    id: record.id,
                    version_id: record.version_id,
                    version_index: record.version_index,
                    last_modified: record.last_modified,
                    author: record.author,
                    properties: descriptor.properties,
                    template_codes: descriptor
                        .elements
                        .iter()
                        .map(|element| element.template_code)
                        .collect(),
                })
            })
            .collect()
    }

    /// One page of template ids in ascending order, after `continuation_token`.
    pub fn list(
        &self,
        continuation_token: Option<&str>,
    ) -> VStoreResult<ContinuationContainer<IdentifyableRecord>> {
        let after = parse_continuation_token(continuation_token)?;
        let records = self.store.list_templates(after, self.list_batch_size)?;
        let items: Vec<_> = records
            .into_iter()
            .map(|record| IdentifyableRecord {
                id: record.id,
                last_modified: record.last_modified,
            })
            .collect();
        let next = next_continuation_token(&items, continuation_token);
        Ok(ContinuationContainer::new(items, next))
    }

    pub fn get_templates_metadata(
        &self,
        ids: &[TemplateId],
    ) -> VStoreResult<Vec<ObjectMetadataRecord>> {
        Ok(self
            .store
            .latest_templates(ids)?
            .into_iter()
            .map(|record| ObjectMetadataRecord {
                id: record.id,
                version_id: record.version_id,
                last_modified: record.last_modified,
                author: record.author,
            })
            .collect())
    }

    fn cached(
        &self,
        id: TemplateId,
        version_id: &VersionId,
    ) -> VStoreResult<Option<Arc<VersionedTemplateDescriptor>>> {
        let cache = self
            .cache
            .read()
            .map_err(|_| VStoreError::Internal("template cache poisoned".into()))?;
        Ok(cache.get(&(id, version_id.clone())).cloned())
    }

    #[cfg(test)]
    fn cached_len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or_default()
    }
}

impl fmt::Debug for TemplatesStorageReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplatesStorageReader")
            .field("list_batch_size", &self.list_batch_size)
            .finish_non_exhaustive()
    }
}

fn to_descriptor(record: &TemplateRecord) -> VStoreResult<VersionedTemplateDescriptor> {
    let descriptor = record.descriptor()?;
    Ok(VersionedTemplateDescriptor {
        id: record.id,
        version_id: record.version_id.clone(),
        version_index: record.version_index,
        last_modified: record.last_modified,
        author: record.author.clone(),
        properties: descriptor.properties,
        elements: descriptor.elements,
    })
}

pub(crate) fn parse_continuation_token(token: Option<&str>) -> VStoreResult<Option<i64>> {
    token
        .map(|token| {
            token.trim().parse::<i64>().map_err(|_| {
                VStoreError::InputValidation(format!("malformed continuation token {token:?}"))
            })
        })
        .transpose()
}

pub(crate) fn next_continuation_token(
    items: &[IdentifyableRecord],
    current: Option<&str>,
) -> Option<String> {
    match items.last() {
        Some(last) => Some(last.id.to_string()),
        None => current.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use vstore_store::{codec, InMemoryTemplateStore, TemplateVersionCommit};
    use vstore_types::{
        AuthorInfo, ColorElementConstraints, ConstraintSet, ElementConstraints, ElementDescriptor,
        ElementType, TemplateDescriptor,
    };

    use super::*;

    fn put(store: &InMemoryTemplateStore, id: TemplateId, index: i64, codes: &[i32]) -> VersionId {
        let previous = store.latest_template(id).unwrap().map(|r| r.version_id);
        let descriptor = TemplateDescriptor {
            properties: json!({"index": index}),
            elements: codes
                .iter()
                .map(|code| {
                    ElementDescriptor::new(
                        ElementType::Color,
                        *code,
                        json!({}),
                        ConstraintSet::unspecified(ElementConstraints::Color(
                            ColorElementConstraints {},
                        )),
                    )
                })
                .collect(),
        };
        let version_id = VersionId::generate();
        store
            .commit_template_version(TemplateVersionCommit {
                record: TemplateRecord {
                    id,
                    version_id: version_id.clone(),
                    version_index: index,
                    last_modified: Utc::now(),
                    author: AuthorInfo::new("tester"),
                    data: codec::encode(&descriptor).unwrap(),
                },
                expected_previous: previous,
            })
            .unwrap();
        version_id
    }

    fn reader(store: Arc<InMemoryTemplateStore>, batch: usize) -> TemplatesStorageReader {
        TemplatesStorageReader::new(store, batch)
    }

    #[test]
    fn descriptor_of_latest_and_pinned_versions() {
        let store = Arc::new(InMemoryTemplateStore::new());
        let v0 = put(&store, 1, 0, &[1]);
        let v1 = put(&store, 1, 1, &[1, 2]);
        let reader = reader(store, 10);

        let latest = reader.get_template_descriptor(1, None).unwrap();
        assert_eq!(latest.version_id, v1);
        assert_eq!(latest.elements.len(), 2);

        let pinned = reader.get_template_descriptor(1, Some(&v0)).unwrap();
        assert_eq!(pinned.version_index, 0);
        assert_eq!(pinned.properties, json!({"index": 0}));
    }

    #[test]
    fn descriptors_are_cached_per_version() {
        let store = Arc::new(InMemoryTemplateStore::new());
        let v0 = put(&store, 1, 0, &[1]);
        let reader = reader(store, 10);

        let first = reader.get_template_descriptor(1, Some(&v0)).unwrap();
        let second = reader.get_template_descriptor(1, Some(&v0)).unwrap();
        let latest = reader.get_template_descriptor(1, None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &latest));
        assert_eq!(reader.cached_len(), 1);
    }

    #[test]
    fn missing_template_is_not_found() {
        let reader = reader(Arc::new(InMemoryTemplateStore::new()), 10);
        assert!(matches!(
            reader.get_template_descriptor(9, None),
            Err(VStoreError::NotFound(_))
        ));
        assert!(matches!(
            reader.get_template_descriptor(9, Some(&VersionId::new("nope"))),
            Err(VStoreError::NotFound(_))
        ));
        assert!(matches!(
            reader.get_template_latest_version(9),
            Err(VStoreError::NotFound(_))
        ));
        assert!(matches!(
            reader.get_template_versions(9),
            Err(VStoreError::NotFound(_))
        ));
        assert!(!reader.is_template_exists(9).unwrap());
    }

    #[test]
    fn versions_are_newest_first_with_codes() {
        let store = Arc::new(InMemoryTemplateStore::new());
        put(&store, 1, 0, &[1]);
        let v1 = put(&store, 1, 1, &[1, 2]);
        let reader = reader(store, 10);

        let versions = reader.get_template_versions(1).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version_id, v1);
        assert_eq!(versions[0].template_codes, vec![1, 2]);
        assert_eq!(versions[1].version_index, 0);

        let head = reader.get_template_latest_version(1).unwrap();
        assert_eq!(head.version_index, 1);
    }

    #[test]
    fn list_pages_through_ids() {
        let store = Arc::new(InMemoryTemplateStore::new());
        for id in [3, 1, 2] {
            put(&store, id, 0, &[1]);
        }
        let reader = reader(store, 2);

        let page = reader.list(None).unwrap();
        assert_eq!(page.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(page.continuation_token.as_deref(), Some("2"));

        let page = reader.list(Some("2")).unwrap();
        assert_eq!(page.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3]);

        let page = reader.list(Some("3")).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.continuation_token.as_deref(), Some("3"));

        assert!(matches!(
            reader.list(Some("abc")),
            Err(VStoreError::InputValidation(_))
        ));
    }

    #[test]
    fn metadata_skips_unknown_ids() {
        let store = Arc::new(InMemoryTemplateStore::new());
        let v = put(&store, 1, 0, &[1]);
        let reader = reader(store, 10);
        let metadata = reader.get_templates_metadata(&[1, 5]).unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].version_id, v);
        assert_eq!(metadata[0].author.author, "tester");
    }
}
