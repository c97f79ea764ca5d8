use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use vstore_lock::{LockKey, LockManager};
use vstore_store::{codec, TemplateRecord, TemplateStore, TemplateVersionCommit};
use vstore_types::{
    AuthorInfo, ConstraintSet, ElementConstraints, ElementDescriptor, ElementType,
    TemplateDescriptor, TemplateId, VersionId,
};
use vstore_validation::TemplateChecker;

use crate::error::{VStoreError, VStoreResult};
use crate::metrics::VStoreMetrics;

/// Writes template versions.
pub struct TemplatesManagementService {
    store: Arc<dyn TemplateStore>,
    locks: Arc<dyn LockManager>,
    checker: TemplateChecker,
    metrics: Arc<VStoreMetrics>,
}

impl TemplatesManagementService {
    pub fn new(
        store: Arc<dyn TemplateStore>,
        locks: Arc<dyn LockManager>,
        checker: TemplateChecker,
        metrics: Arc<VStoreMetrics>,
    ) -> Self {
        Self {
            store,
            locks,
            checker,
            metrics,
        }
    }

    /// Write version 0 of a new template.
    pub async fn create_template(
        &self,
        id: TemplateId,
        author: AuthorInfo,
        descriptor: TemplateDescriptor,
    ) -> VStoreResult<VersionId> {
        if id == 0 {
            return Err(VStoreError::InputValidation("template id must be set".into()));
        }

        let _lease = self.locks.acquire_lock(LockKey::template(id)).await?;
        if self.store.template_exists(id)? {
            return Err(VStoreError::AlreadyExists(id));
        }
        self.check_elements(id, &descriptor)?;
        self.put_template(id, None, 0, author, &descriptor)
    }

    /// Write the version following `version_id`, which must be the latest.
    pub async fn modify_template(
        &self,
        id: TemplateId,
        version_id: &VersionId,
        author: AuthorInfo,
        descriptor: TemplateDescriptor,
    ) -> VStoreResult<VersionId> {
        if id == 0 {
            return Err(VStoreError::InputValidation("template id must be set".into()));
        }
        if version_id.is_unset() {
            return Err(VStoreError::InputValidation(
                "template version id must be set".into(),
            ));
        }

        let _lease = self.locks.acquire_lock(LockKey::template(id)).await?;
        let latest = self
            .store
            .latest_template(id)?
            .ok_or_else(|| VStoreError::NotFound(format!("template {id}")))?;
        if !latest.version_id.matches(version_id) {
            return Err(VStoreError::Concurrency {
                id,
                presented: version_id.clone(),
                latest: latest.version_id,
            });
        }
        self.check_elements(id, &descriptor)?;
        self.put_template(
            id,
            Some(latest.version_id),
            latest.version_index + 1,
            author,
            &descriptor,
        )
    }

    /// One sample descriptor per element type, with default constraints.
    pub fn available_element_descriptors(&self) -> Vec<ElementDescriptor> {
        ElementType::ALL
            .iter()
            .zip(1..)
            .map(|(element_type, code)| {
                ElementDescriptor::new(
                    *element_type,
                    code,
                    json!({}),
                    ConstraintSet::unspecified(ElementConstraints::default_for(*element_type)),
                )
            })
            .collect()
    }

    fn check_elements(&self, id: TemplateId, descriptor: &TemplateDescriptor) -> VStoreResult<()> {
        let errors = self.checker.check(&descriptor.elements);
        if errors.is_empty() {
            return Ok(());
        }
        warn!(id, count = errors.len(), "template rejected");
        Err(VStoreError::TemplateValidation(errors))
    }

    fn put_template(
        &self,
        id: TemplateId,
        expected_previous: Option<VersionId>,
        version_index: i64,
        author: AuthorInfo,
        descriptor: &TemplateDescriptor,
    ) -> VStoreResult<VersionId> {
        let version_id = VersionId::generate();
        let record = TemplateRecord {
            id,
            version_id: version_id.clone(),
            version_index,
            last_modified: Utc::now(),
            author,
            data: codec::encode(descriptor)?,
        };
        self.store.commit_template_version(TemplateVersionCommit {
            record,
            expected_previous,
        })?;
        self.metrics.record_template_commit();
        info!(id, version_id = %version_id, version_index, "template version committed");
        Ok(version_id)
    }
}

impl fmt::Debug for TemplatesManagementService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplatesManagementService")
            .field("checker", &self.checker)
            .finish_non_exhaustive()
    }
}
