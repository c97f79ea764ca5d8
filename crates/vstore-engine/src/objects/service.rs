use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use vstore_binary::BinaryMetadataResolver;
use vstore_events::{EventPublisher, ObjectVersionCreatingEvent};
use vstore_lock::{LockKey, LockManager};
use vstore_store::{
    codec, ObjectElementLinkRecord, ObjectElementRecord, ObjectRecord, ObjectStore,
    ObjectVersionCommit,
};
use vstore_types::{
    AuthorInfo, ElementId, Language, ObjectDescriptor, ObjectElementDescriptor,
    ObjectElementPersistenceDescriptor, ObjectId, ObjectPersistenceDescriptor, TemplateCode,
    TemplateId, VersionId,
};
use vstore_validation::{merge_errors, validate_element, ObjectValidationErrors};

use crate::config::VStoreConfig;
use crate::consistency::ensure_elements_state;
use crate::error::{VStoreError, VStoreResult};
use crate::metrics::VStoreMetrics;
use crate::objects::binaries::{resolve_binaries, validate_binaries};
use crate::objects::persistence::compute_links;
use crate::objects::preprocess::harmonize_elements;
use crate::objects::reader::ObjectsStorageReader;
use crate::templates::TemplatesStorageReader;
use crate::vstore::Backends;

/// Incoming payload of a write, after input checks.
struct ObjectPayload {
    template_id: TemplateId,
    template_version_id: VersionId,
    language: Language,
    properties: Value,
    elements: Vec<ObjectElementDescriptor>,
}

/// The latest version a write builds on.
struct CurrentVersion {
    record: ObjectRecord,
    elements: Vec<ObjectElementDescriptor>,
    links: Vec<ObjectElementLinkRecord>,
}

/// Everything the commit pipeline needs for one new version.
struct PendingVersion {
    id: ObjectId,
    author: AuthorInfo,
    template_id: TemplateId,
    template_version_id: VersionId,
    language: Language,
    properties: Value,
    /// Candidates for new element rows.
    elements: Vec<ObjectElementDescriptor>,
    current: Option<CurrentVersion>,
    /// Element ids the new version links to, when restricted.
    keep: Option<HashSet<ElementId>>,
    /// `None`: the codes of the rows actually written.
    modified_elements: Option<Vec<TemplateCode>>,
    /// Skip rows whose persisted form equals the current one.
    skip_unchanged: bool,
}

/// Writes object versions: create, modify and template upgrade.
pub struct ObjectsManagementService {
    store: Arc<dyn ObjectStore>,
    locks: Arc<dyn LockManager>,
    binaries: Arc<dyn BinaryMetadataResolver>,
    events: Arc<dyn EventPublisher>,
    templates: Arc<TemplatesStorageReader>,
    objects: Arc<ObjectsStorageReader>,
    metrics: Arc<VStoreMetrics>,
    events_topic: String,
    concurrency: usize,
}

impl ObjectsManagementService {
    pub fn new(
        backends: &Backends,
        templates: Arc<TemplatesStorageReader>,
        objects: Arc<ObjectsStorageReader>,
        metrics: Arc<VStoreMetrics>,
        config: &VStoreConfig,
    ) -> Self {
        Self {
            store: Arc::clone(&backends.object_store),
            locks: Arc::clone(&backends.locks),
            binaries: Arc::clone(&backends.binaries),
            events: Arc::clone(&backends.events),
            templates,
            objects,
            metrics,
            events_topic: config.object_events_topic.clone(),
            concurrency: config.validation_concurrency,
        }
    }

    /// Write version 0 of a new object.
    pub async fn create(
        &self,
        id: ObjectId,
        author: AuthorInfo,
        descriptor: ObjectDescriptor,
    ) -> VStoreResult<VersionId> {
        let payload = check_input(id, descriptor)?;

        let _lease = self.locks.acquire_lock(LockKey::object(id)).await?;
        if self.store.object_exists(id)? {
            return Err(VStoreError::AlreadyExists(id));
        }

        let template = self
            .templates
            .get_template_descriptor(payload.template_id, Some(&payload.template_version_id))?;
        if template.elements.len() != payload.elements.len() {
            return Err(VStoreError::Inconsistent(format!(
                "template {} version {} has {} elements, object has {}",
                template.id,
                template.version_id,
                template.elements.len(),
                payload.elements.len()
            )));
        }
        ensure_unique_ids(&payload.elements)?;
        ensure_elements_state(&template.elements, &payload.elements)?;

        let modified = payload.elements.iter().map(|e| e.template_code).collect();
        self.put_object(PendingVersion {
            id,
            author,
            template_id: payload.template_id,
            template_version_id: payload.template_version_id,
            language: payload.language,
            properties: payload.properties,
            elements: payload.elements,
            current: None,
            keep: None,
            modified_elements: Some(modified),
            skip_unchanged: false,
        })
        .await
    }

    /// Write the version following `version_id` with new values for some of
    /// its elements. Elements whose stored form does not change keep their
    /// element version.
    pub async fn modify(
        &self,
        id: ObjectId,
        version_id: &VersionId,
        author: AuthorInfo,
        descriptor: ObjectDescriptor,
    ) -> VStoreResult<VersionId> {
        let payload = check_input(id, descriptor)?;
        ensure_version_set(version_id)?;

        let _lease = self.locks.acquire_lock(LockKey::object(id)).await?;
        let current = self.current_version(id, version_id)?;
        let record = &current.record;
        let language = record.descriptor()?.language;
        if payload.template_id != record.template_id
            || !payload.template_version_id.matches(&record.template_version_id)
        {
            return Err(VStoreError::Inconsistent(format!(
                "object {id} is pinned to template {} version {}",
                record.template_id, record.template_version_id
            )));
        }
        if payload.language != language {
            return Err(VStoreError::Inconsistent(format!(
                "object {id} is written in {language}"
            )));
        }

        ensure_unique_ids(&payload.elements)?;
        let current_ids: HashSet<_> = current.elements.iter().map(|e| e.id).collect();
        if let Some(unknown) = payload.elements.iter().find(|e| !current_ids.contains(&e.id)) {
            return Err(VStoreError::Inconsistent(format!(
                "element {} is not part of object {id}",
                unknown.id
            )));
        }
        ensure_elements_state(&current.elements, &payload.elements)?;

        let pinned = record.template_version_id.clone();
        self.put_object(PendingVersion {
            id,
            author,
            template_id: payload.template_id,
            template_version_id: pinned,
            language,
            properties: payload.properties,
            elements: payload.elements,
            current: Some(current),
            keep: Some(current_ids),
            modified_elements: None,
            skip_unchanged: true,
        })
        .await
    }

    /// Move the object to a later version of its template.
    ///
    /// Every element is validated against the target template. Elements whose
    /// stored form changes, including a changed constraint set, get new rows;
    /// `modified_template_codes` is recorded as the version's modified
    /// elements.
    pub async fn upgrade(
        &self,
        id: ObjectId,
        version_id: &VersionId,
        author: AuthorInfo,
        modified_template_codes: Vec<TemplateCode>,
        descriptor: ObjectDescriptor,
    ) -> VStoreResult<VersionId> {
        let payload = check_input(id, descriptor)?;
        ensure_version_set(version_id)?;

        let _lease = self.locks.acquire_lock(LockKey::object(id)).await?;
        let current = self.current_version(id, version_id)?;
        let record = &current.record;
        let language = record.descriptor()?.language;
        if payload.template_id != record.template_id {
            return Err(VStoreError::Upgrade(format!(
                "object {id} cannot move from template {} to template {}",
                record.template_id, payload.template_id
            )));
        }
        if payload.template_version_id.matches(&record.template_version_id) {
            return Err(VStoreError::Upgrade(format!(
                "object {id} already uses template version {}",
                record.template_version_id
            )));
        }
        if payload.language != language {
            return Err(VStoreError::Upgrade(format!(
                "object {id} cannot change language from {language} to {}",
                payload.language
            )));
        }
        ensure_unique_ids(&payload.elements)?;

        let target = self
            .templates
            .get_template_descriptor(payload.template_id, Some(&payload.template_version_id))?;
        if target.elements.len() != payload.elements.len() {
            return Err(VStoreError::Inconsistent(format!(
                "template {} version {} has {} elements, object has {}",
                target.id,
                target.version_id,
                target.elements.len(),
                payload.elements.len()
            )));
        }
        self.ensure_forward(
            payload.template_id,
            &record.template_version_id,
            &payload.template_version_id,
        )?;
        ensure_elements_state(&target.elements, &payload.elements)?;

        let keep: HashSet<_> = payload.elements.iter().map(|e| e.id).collect();
        self.put_object(PendingVersion {
            id,
            author,
            template_id: payload.template_id,
            template_version_id: payload.template_version_id,
            language,
            properties: payload.properties,
            elements: payload.elements,
            current: Some(current),
            keep: Some(keep),
            modified_elements: Some(modified_template_codes),
            skip_unchanged: true,
        })
        .await
    }

    fn current_version(&self, id: ObjectId, version_id: &VersionId) -> VStoreResult<CurrentVersion> {
        let record = self
            .store
            .latest_object(id)?
            .ok_or_else(|| VStoreError::NotFound(format!("object {id}")))?;
        if !record.version_id.matches(version_id) {
            return Err(VStoreError::Concurrency {
                id,
                presented: version_id.clone(),
                latest: record.version_id,
            });
        }
        let elements = self.objects.load_elements(&record)?;
        let links = self.store.object_links(id, &record.version_id)?;
        Ok(CurrentVersion {
            record,
            elements,
            links,
        })
    }

    /// The target template version must come strictly after the current one.
    fn ensure_forward(
        &self,
        template_id: TemplateId,
        current: &VersionId,
        target: &VersionId,
    ) -> VStoreResult<()> {
        let versions = self.templates.get_template_versions(template_id)?;
        let index_of = |version_id: &VersionId| {
            let index = versions
                .iter()
                .find(|v| &v.version_id == version_id)
                .map(|v| v.version_index);
            if index.is_none() {
                error!(template_id, %version_id, "template version missing from history");
            }
            index.ok_or_else(|| {
                VStoreError::NotFound(format!("template {template_id} version {version_id}"))
            })
        };
        let current_index = index_of(current)?;
        let target_index = index_of(target)?;
        if target_index <= current_index {
            return Err(VStoreError::Upgrade(format!(
                "template version {target} (index {target_index}) does not follow {current} (index {current_index})"
            )));
        }
        Ok(())
    }

    // ---- commit pipeline ----

    async fn put_object(&self, mut pending: PendingVersion) -> VStoreResult<VersionId> {
        let id = pending.id;
        harmonize_elements(&mut pending.elements);

        let mut errors = self
            .validate_contents(&pending.elements, pending.language)
            .await?;
        let previous_keys: HashSet<String> = pending
            .current
            .iter()
            .flat_map(|current| current.elements.iter())
            .flat_map(|e| e.value.file_keys())
            .map(str::to_string)
            .collect();
        let resolution = resolve_binaries(
            &self.binaries,
            &pending.elements,
            &previous_keys,
            self.concurrency,
        )
        .await?;
        merge_errors(&mut errors, resolution.errors);
        merge_errors(
            &mut errors,
            validate_binaries(&pending.elements, pending.language, &resolution.binaries),
        );
        if !errors.is_empty() {
            warn!(id, invalid = errors.len(), "object version rejected");
            return Err(VStoreError::InvalidObject { id, errors });
        }

        let previous_version = pending.current.as_ref().map(|c| c.record.version_id.clone());
        let envelope = ObjectVersionCreatingEvent::new(id, previous_version.clone())
            .to_envelope(&self.events_topic)?;
        self.events.publish(envelope).await?;

        let stored: HashMap<ElementId, ObjectElementPersistenceDescriptor> = if pending.skip_unchanged
        {
            pending
                .current
                .iter()
                .flat_map(|current| current.elements.iter())
                .map(|e| (e.id, e.persistence()))
                .collect()
        } else {
            HashMap::new()
        };

        let now = Utc::now();
        let mut rows = Vec::new();
        let mut written_codes = Vec::new();
        let mut referenced_binaries = 0;
        for element in &pending.elements {
            let (value, binaries) = element
                .value
                .to_persistence(|key| resolution.binaries.metadata(key))
                .map_err(|key| {
                    VStoreError::Internal(format!("binary {key} was not resolved"))
                })?;
            let data = ObjectElementPersistenceDescriptor {
                element_type: value.element_type(),
                template_code: element.template_code,
                properties: element.properties.clone(),
                constraints: element.constraints.clone(),
                value,
            };
            if stored.get(&element.id) == Some(&data) {
                continue;
            }
            referenced_binaries += binaries;
            written_codes.push(element.template_code);
            rows.push(ObjectElementRecord {
                id: element.id,
                version_id: VersionId::generate(),
                last_modified: now,
                data: codec::encode(&data)?,
            });
        }

        let version_id = VersionId::generate();
        let version_index = pending
            .current
            .as_ref()
            .map_or(0, |current| current.record.version_index + 1);
        let written: Vec<_> = rows.iter().map(|r| (r.id, r.version_id.clone())).collect();
        let previous_links = pending
            .current
            .as_ref()
            .map(|current| current.links.as_slice())
            .unwrap_or_default();
        let links = compute_links(
            id,
            &version_id,
            previous_links,
            &written,
            pending.keep.as_ref(),
        );
        let object = ObjectRecord {
            id,
            version_id: version_id.clone(),
            version_index,
            template_id: pending.template_id,
            template_version_id: pending.template_version_id,
            last_modified: now,
            author: pending.author,
            modified_elements: pending.modified_elements.unwrap_or(written_codes),
            data: codec::encode(&ObjectPersistenceDescriptor {
                language: pending.language,
                properties: pending.properties,
            })?,
        };

        let commit = ObjectVersionCommit {
            object,
            elements: rows,
            links,
            expected_previous: previous_version,
        };
        let new_elements = commit.elements.len();
        if let Err(err) = self.store.commit_object_version(commit) {
            error!(id, %version_id, error = %err, "object version announced but not committed");
            return Err(err.into());
        }

        self.metrics.record_object_commit(referenced_binaries);
        info!(
            id,
            %version_id,
            version_index,
            new_elements,
            referenced_binaries,
            "object version committed"
        );
        Ok(version_id)
    }

    /// Content rules of every element, at most `concurrency` elements at a
    /// time.
    async fn validate_contents(
        &self,
        elements: &[ObjectElementDescriptor],
        language: Language,
    ) -> VStoreResult<ObjectValidationErrors> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for element in elements {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| VStoreError::Internal(e.to_string()))?;
            let element = element.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let errors = validate_element(&element, language);
                (element.template_code, errors)
            });
        }

        let mut errors = ObjectValidationErrors::new();
        while let Some(joined) = tasks.join_next().await {
            let (code, element_errors) =
                joined.map_err(|e| VStoreError::Internal(e.to_string()))?;
            if !element_errors.is_empty() {
                errors.entry(code).or_default().extend(element_errors);
            }
        }
        Ok(errors)
    }
}

impl fmt::Debug for ObjectsManagementService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectsManagementService")
            .field("events_topic", &self.events_topic)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

fn check_input(id: ObjectId, descriptor: ObjectDescriptor) -> VStoreResult<ObjectPayload> {
    if id <= 0 {
        return Err(VStoreError::InputValidation(format!(
            "object id must be positive, got {id}"
        )));
    }
    if !descriptor.language.is_specified() {
        return Err(VStoreError::InputValidation("language must be specified".into()));
    }
    if descriptor.template_id == 0 {
        return Err(VStoreError::InputValidation("template id must be set".into()));
    }
    if descriptor.template_version_id.is_unset() {
        return Err(VStoreError::InputValidation(
            "template version id must be set".into(),
        ));
    }
    let properties = descriptor
        .properties
        .ok_or_else(|| VStoreError::InputValidation("properties must be set".into()))?;
    let elements = descriptor
        .elements
        .ok_or_else(|| VStoreError::InputValidation("elements must be set".into()))?;
    Ok(ObjectPayload {
        template_id: descriptor.template_id,
        template_version_id: descriptor.template_version_id,
        language: descriptor.language,
        properties,
        elements,
    })
}

fn ensure_version_set(version_id: &VersionId) -> VStoreResult<()> {
    if version_id.is_unset() {
        return Err(VStoreError::InputValidation(
            "object version id must be set".into(),
        ));
    }
    Ok(())
}

fn ensure_unique_ids(elements: &[ObjectElementDescriptor]) -> VStoreResult<()> {
    let mut seen = HashSet::with_capacity(elements.len());
    match elements.iter().find(|e| !seen.insert(e.id)) {
        Some(duplicate) => Err(VStoreError::Inconsistent(format!(
            "element id {} is used more than once",
            duplicate.id
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use vstore_lock::LockManager;
    use vstore_store::ObjectStore;
    use vstore_types::{ElementDescriptor, ElementValue, TextElementValue};
    use vstore_validation::ElementValidationError;

    use super::*;
    use crate::testing::*;
    use crate::vstore::{InMemoryBackends, VStore};

    struct Setup {
        store: VStore,
        backends: InMemoryBackends,
        text: ElementDescriptor,
        image: ElementDescriptor,
        template_version: VersionId,
    }

    async fn setup() -> Setup {
        let (store, backends) = harness();
        let text = text_element(TEXT_CODE, 20);
        let image = image_element(IMAGE_CODE);
        let template_version = store
            .create_template(1, author(), template(vec![text.clone(), image.clone()]))
            .await
            .unwrap();
        upload(&backends, "upload-1", "logo.png", png(64, 48));
        upload(&backends, "upload-2", "banner.png", png(64, 48));
        Setup {
            store,
            backends,
            text,
            image,
            template_version,
        }
    }

    impl Setup {
        fn object(&self, text: &str, key: &str) -> ObjectDescriptor {
            object(
                1,
                &self.template_version,
                vec![text_value(&self.text, text), image_value(&self.image, key)],
            )
        }

        fn links(&self, id: ObjectId, version_id: &VersionId) -> Vec<(ElementId, VersionId)> {
            let mut links: Vec<_> = self
                .backends
                .object_store
                .object_links(id, version_id)
                .unwrap()
                .into_iter()
                .map(|l| (l.element_id, l.element_version_id))
                .collect();
            links.sort();
            links
        }

        fn rows(&self) -> (usize, usize) {
            let store = &self.backends.object_store;
            (
                store.object_row_count().unwrap(),
                store.element_row_count().unwrap(),
            )
        }
    }

    #[tokio::test]
    async fn second_create_is_already_exists() {
        let s = setup().await;
        s.store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        let err = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, VStoreError::AlreadyExists(10)));
        assert_eq!(s.rows(), (1, 2));
    }

    #[tokio::test]
    async fn versions_advance_by_one_with_fresh_ids() {
        let s = setup().await;
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        let v1 = s
            .store
            .modify_object(10, &v0, author(), object(1, &s.template_version, vec![text_value(&s.text, "Bye")]))
            .await
            .unwrap();
        assert_ne!(v0, v1);

        let versions = s.backends.object_store.object_versions(10).unwrap();
        let heads: Vec<_> = versions
            .iter()
            .map(|r| (r.version_id.clone(), r.version_index))
            .collect();
        assert_eq!(heads, vec![(v1, 1), (v0, 0)]);
        assert_eq!(versions[1].modified_elements, vec![TEXT_CODE, IMAGE_CODE]);
        assert_eq!(versions[0].modified_elements, vec![TEXT_CODE]);
        assert_eq!(s.store.metrics().object_versions_committed, 2);
        assert_eq!(s.store.metrics().referenced_binaries, 1);
    }

    #[tokio::test]
    async fn stale_version_is_concurrency_error_regardless_of_payload() {
        let s = setup().await;
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        s.store
            .modify_object(10, &v0, author(), object(1, &s.template_version, vec![text_value(&s.text, "Bye")]))
            .await
            .unwrap();

        let too_long = "x".repeat(100);
        let err = s
            .store
            .modify_object(
                10,
                &v0,
                author(),
                object(1, &s.template_version, vec![text_value(&s.text, &too_long)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VStoreError::Concurrency { id: 10, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unchanged_elements_share_element_versions() {
        let s = setup().await;
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        let v1 = s
            .store
            .modify_object(10, &v0, author(), object(1, &s.template_version, vec![text_value(&s.text, "Bye")]))
            .await
            .unwrap();

        let before = s.links(10, &v0);
        let after = s.links(10, &v1);
        let image_id = i64::from(IMAGE_CODE) + 1;
        let text_id = i64::from(TEXT_CODE) + 1;
        let version_of = |links: &[(ElementId, VersionId)], id| {
            links.iter().find(|(e, _)| *e == id).map(|(_, v)| v.clone())
        };
        assert_eq!(version_of(&before, image_id), version_of(&after, image_id));
        assert_ne!(version_of(&before, text_id), version_of(&after, text_id));
        assert_eq!(s.rows(), (2, 3));
    }

    #[tokio::test]
    async fn resubmitting_the_same_value_writes_no_element_row() {
        let s = setup().await;
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        let v1 = s
            .store
            .modify_object(10, &v0, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        assert_eq!(s.links(10, &v0), s.links(10, &v1));
        assert_eq!(s.rows(), (2, 2));

        let latest = s.backends.object_store.latest_object(10).unwrap().unwrap();
        assert!(latest.modified_elements.is_empty());
    }

    #[tokio::test]
    async fn constraint_drift_is_inconsistent_and_writes_nothing() {
        let s = setup().await;
        let mut drifted = text_value(&s.text, "Hello");
        drifted.constraints = text_constraints(21);
        let descriptor = object(
            1,
            &s.template_version,
            vec![drifted, image_value(&s.image, "upload-1")],
        );
        let err = s.store.create_object(10, author(), descriptor).await.unwrap_err();
        assert!(matches!(err, VStoreError::Inconsistent(_)));
        assert_eq!(s.rows(), (0, 0));
        assert!(!s.store.is_object_exists(10).await.unwrap());
    }

    #[tokio::test]
    async fn element_count_and_duplicate_ids_are_inconsistent() {
        let s = setup().await;
        let short = object(1, &s.template_version, vec![text_value(&s.text, "Hello")]);
        assert!(matches!(
            s.store.create_object(10, author(), short).await,
            Err(VStoreError::Inconsistent(_))
        ));

        let mut image = image_value(&s.image, "upload-1");
        image.id = i64::from(TEXT_CODE) + 1;
        let duplicated = object(1, &s.template_version, vec![text_value(&s.text, "Hello"), image]);
        assert!(matches!(
            s.store.create_object(10, author(), duplicated).await,
            Err(VStoreError::Inconsistent(_))
        ));
    }

    #[tokio::test]
    async fn content_and_binary_errors_are_reported_together() {
        let s = setup().await;
        let too_long = "x".repeat(21);
        let err = s
            .store
            .create_object(10, author(), s.object(&too_long, "missing-upload"))
            .await
            .unwrap_err();
        let VStoreError::InvalidObject { id, errors } = err else {
            panic!("expected invalid object, got {err:?}");
        };
        assert_eq!(id, 10);
        assert_eq!(
            errors.get(&TEXT_CODE),
            Some(&vec![ElementValidationError::TextTooLong {
                max_symbols: 20,
                actual: 21
            }])
        );
        assert_eq!(
            errors.get(&IMAGE_CODE),
            Some(&vec![ElementValidationError::BinaryNotFound {
                file_key: "missing-upload".into()
            }])
        );
        assert_eq!(s.rows(), (0, 0));
        assert!(s.backends.events.published().unwrap().is_empty());
    }

    #[tokio::test]
    async fn persisted_image_embeds_resolved_metadata() {
        let s = setup().await;
        let version = s
            .store
            .create_object(1, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();

        let descriptor = s
            .store
            .get_object_descriptor(1, None, &Default::default())
            .await
            .unwrap();
        assert_eq!(descriptor.version_id, version);
        let ElementValue::BitmapImage(value) = &descriptor.element(IMAGE_CODE).unwrap().value else {
            panic!("expected a bitmap image");
        };
        assert_eq!(value.raw, "upload-1");
        assert_eq!(value.filename.as_deref(), Some("logo.png"));
        assert_eq!(value.filesize, Some(png(64, 48).len() as u64));
    }

    #[tokio::test]
    async fn creating_event_carries_previous_version() {
        let s = setup().await;
        let mut stream = s.backends.events.subscribe("vstore.objects").unwrap();
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        s.store
            .modify_object(10, &v0, author(), object(1, &s.template_version, vec![text_value(&s.text, "Bye")]))
            .await
            .unwrap();

        let first = stream.recv().await.unwrap().decode_object_event().unwrap();
        let second = stream.recv().await.unwrap().decode_object_event().unwrap();
        assert_eq!(first.object_id, 10);
        assert_eq!(first.current_version_id, None);
        assert_eq!(second.current_version_id, Some(v0));
    }

    #[tokio::test]
    async fn held_lease_fails_fast_with_locked() {
        let s = setup().await;
        let _lease = s.backends.locks.acquire_lock(LockKey::object(10)).await.unwrap();
        let err = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, VStoreError::Locked(_)));
    }

    #[tokio::test]
    async fn malformed_input_is_rejected_before_locking() {
        let s = setup().await;
        let _lease = s.backends.locks.acquire_lock(LockKey::object(10)).await.unwrap();

        let mut unspecified = s.object("Hello", "upload-1");
        unspecified.language = Language::Unspecified;
        assert!(matches!(
            s.store.create_object(10, author(), unspecified).await,
            Err(VStoreError::InputValidation(_))
        ));

        let mut no_elements = s.object("Hello", "upload-1");
        no_elements.elements = None;
        assert!(matches!(
            s.store.create_object(10, author(), no_elements).await,
            Err(VStoreError::InputValidation(_))
        ));

        assert!(matches!(
            s.store
                .modify_object(10, &VersionId::unset(), author(), s.object("Hello", "upload-1"))
                .await,
            Err(VStoreError::InputValidation(_))
        ));
        assert!(matches!(
            s.store.create_object(0, author(), s.object("Hello", "upload-1")).await,
            Err(VStoreError::InputValidation(_))
        ));
    }

    #[tokio::test]
    async fn modify_cannot_repin_or_add_elements() {
        let s = setup().await;
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();

        let mut other_language = object(1, &s.template_version, vec![text_value(&s.text, "Bye")]);
        other_language.language = Language::En;
        assert!(matches!(
            s.store.modify_object(10, &v0, author(), other_language).await,
            Err(VStoreError::Inconsistent(_))
        ));

        let mut stranger = text_value(&s.text, "Bye");
        stranger.id = 999;
        assert!(matches!(
            s.store
                .modify_object(10, &v0, author(), object(1, &s.template_version, vec![stranger]))
                .await,
            Err(VStoreError::Inconsistent(_))
        ));
    }

    #[tokio::test]
    async fn modify_of_missing_object_is_not_found() {
        let s = setup().await;
        assert!(matches!(
            s.store
                .modify_object(10, &VersionId::new("v"), author(), s.object("Hello", "upload-1"))
                .await,
            Err(VStoreError::NotFound(_))
        ));
    }

    async fn retemplate(s: &Setup, max_symbols: i32) -> (ElementDescriptor, VersionId) {
        let text = text_element(TEXT_CODE, max_symbols);
        let v1 = s
            .store
            .modify_template(
                1,
                &s.template_version,
                author(),
                template(vec![text.clone(), s.image.clone()]),
            )
            .await
            .unwrap();
        (text, v1)
    }

    async fn upgraded_template(s: &Setup) -> (ElementDescriptor, VersionId) {
        retemplate(s, 30).await
    }

    #[tokio::test]
    async fn upgrade_rewrites_changed_elements_only() {
        let s = setup().await;
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        let (wider, template_v1) = upgraded_template(&s).await;

        let descriptor = object(
            1,
            &template_v1,
            vec![
                text_value(&wider, &"y".repeat(25)),
                image_value(&s.image, "upload-1"),
            ],
        );
        let v1 = s
            .store
            .upgrade_object(10, &v0, author(), vec![TEXT_CODE], descriptor)
            .await
            .unwrap();

        let latest = s.backends.object_store.latest_object(10).unwrap().unwrap();
        assert_eq!(latest.version_id, v1);
        assert_eq!(latest.template_version_id, template_v1);
        assert_eq!(latest.modified_elements, vec![TEXT_CODE]);

        let image_id = i64::from(IMAGE_CODE) + 1;
        let image_link = |v: &VersionId| {
            s.links(10, v)
                .into_iter()
                .find(|(e, _)| *e == image_id)
                .map(|(_, v)| v)
        };
        assert_eq!(image_link(&v0), image_link(&v1));
        assert_eq!(s.rows(), (2, 3));

        let descriptor = s
            .store
            .get_object_descriptor(10, None, &Default::default())
            .await
            .unwrap();
        assert_eq!(
            descriptor.element(TEXT_CODE).unwrap().value,
            ElementValue::PlainText(TextElementValue::new("y".repeat(25)))
        );
    }

    #[tokio::test]
    async fn upgrade_must_move_forward() {
        let s = setup().await;
        let (wider, template_v1) = upgraded_template(&s).await;
        let v0 = s
            .store
            .create_object(
                10,
                author(),
                object(
                    1,
                    &template_v1,
                    vec![text_value(&wider, "Hello"), image_value(&s.image, "upload-1")],
                ),
            )
            .await
            .unwrap();

        let backwards = s.object("Hello", "upload-1");
        let err = s
            .store
            .upgrade_object(10, &v0, author(), vec![TEXT_CODE], backwards)
            .await
            .unwrap_err();
        assert!(matches!(err, VStoreError::Upgrade(_)));

        let same = object(
            1,
            &template_v1,
            vec![text_value(&wider, "Hello"), image_value(&s.image, "upload-1")],
        );
        assert!(matches!(
            s.store
                .upgrade_object(10, &v0, author(), vec![TEXT_CODE], same)
                .await,
            Err(VStoreError::Upgrade(_))
        ));
        assert_eq!(s.rows(), (1, 2));
    }

    #[tokio::test]
    async fn upgrade_cannot_switch_template_or_language() {
        let s = setup().await;
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        let (wider, template_v1) = upgraded_template(&s).await;
        let elements = vec![text_value(&wider, "Hello"), image_value(&s.image, "upload-1")];

        let mut other_template = object(1, &template_v1, elements.clone());
        other_template.template_id = 2;
        assert!(matches!(
            s.store
                .upgrade_object(10, &v0, author(), vec![], other_template)
                .await,
            Err(VStoreError::Upgrade(_))
        ));

        let mut other_language = object(1, &template_v1, elements);
        other_language.language = Language::En;
        assert!(matches!(
            s.store
                .upgrade_object(10, &v0, author(), vec![], other_language)
                .await,
            Err(VStoreError::Upgrade(_))
        ));
    }

    #[tokio::test]
    async fn upgrade_validates_carried_values_against_target_limits() {
        let s = setup().await;
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello world here", "upload-1"))
            .await
            .unwrap();
        let (narrow, template_v1) = retemplate(&s, 5).await;

        let descriptor = object(
            1,
            &template_v1,
            vec![
                text_value(&narrow, "Hello world here"),
                image_value(&s.image, "upload-1"),
            ],
        );
        let err = s
            .store
            .upgrade_object(10, &v0, author(), vec![], descriptor)
            .await
            .unwrap_err();
        let VStoreError::InvalidObject { errors, .. } = err else {
            panic!("expected invalid object, got {err:?}");
        };
        assert_eq!(
            errors.get(&TEXT_CODE),
            Some(&vec![ElementValidationError::TextTooLong {
                max_symbols: 5,
                actual: 16
            }])
        );
        assert_eq!(s.rows(), (1, 2));
        let latest = s.backends.object_store.latest_object(10).unwrap().unwrap();
        assert_eq!(latest.template_version_id, s.template_version);
    }

    #[tokio::test]
    async fn upgraded_elements_carry_target_constraints() {
        let s = setup().await;
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        let (narrow, template_v1) = retemplate(&s, 18).await;

        let descriptor = object(
            1,
            &template_v1,
            vec![text_value(&narrow, "Hello"), image_value(&s.image, "upload-1")],
        );
        let v1 = s
            .store
            .upgrade_object(10, &v0, author(), vec![], descriptor)
            .await
            .unwrap();

        let target = s.store.get_template_descriptor(1, Some(&template_v1)).unwrap();
        let upgraded = s
            .store
            .get_object_descriptor(10, Some(&v1), &Default::default())
            .await
            .unwrap();
        assert_eq!(upgraded.template_version_id, template_v1);
        assert!(upgraded.metadata.modified_elements.is_empty());
        for element in &upgraded.elements {
            let slot = target.element(element.template_code).unwrap();
            assert_eq!(element.constraints, slot.constraints);
        }
        // Only the text element changed shape.
        assert_eq!(s.rows(), (2, 3));

        s.store
            .modify_object(
                10,
                &v1,
                author(),
                object(1, &template_v1, vec![text_value(&narrow, "Bye")]),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn presented_version_matches_regardless_of_case() {
        let s = setup().await;
        let v0 = s
            .store
            .create_object(10, author(), s.object("Hello", "upload-1"))
            .await
            .unwrap();
        let shouted = VersionId::new(v0.as_str().to_uppercase());
        assert_ne!(shouted, v0);

        let v1 = s
            .store
            .modify_object(
                10,
                &shouted,
                author(),
                object(1, &s.template_version, vec![text_value(&s.text, "Bye")]),
            )
            .await
            .unwrap();
        let latest = s.backends.object_store.latest_object(10).unwrap().unwrap();
        assert_eq!(latest.version_id, v1);
        assert_eq!(latest.template_version_id, s.template_version);
    }
}
