use vstore_types::{ElementId, ObjectId, TemplateId, VersionId};

use crate::error::StoreResult;
use crate::records::{
    ObjectElementLinkRecord, ObjectElementRecord, ObjectRecord, ObjectVersionCommit,
    TemplateRecord, TemplateVersionCommit,
};

/// Template version rows.
///
/// All implementations must satisfy these invariants:
/// - Rows are never mutated or deleted once committed.
/// - `(id, version_id)` and `(id, version_index)` are unique.
/// - The latest version is the one with the highest `version_index`.
/// - `commit_template_version` is atomic and rejects a commit whose
///   `expected_previous` is not the current latest version.
pub trait TemplateStore: Send + Sync {
    /// Latest version of `id`, or `None` if the template does not exist.
    fn latest_template(&self, id: TemplateId) -> StoreResult<Option<TemplateRecord>>;

    /// A specific version.
    fn template_version(
        &self,
        id: TemplateId,
        version_id: &VersionId,
    ) -> StoreResult<Option<TemplateRecord>>;

    /// Every version of `id`, newest first. Empty if the template does not exist.
    fn template_versions(&self, id: TemplateId) -> StoreResult<Vec<TemplateRecord>>;

    fn template_exists(&self, id: TemplateId) -> StoreResult<bool> {
        Ok(self.latest_template(id)?.is_some())
    }

    /// Latest versions of up to `limit` templates with ids greater than
    /// `after`, ascending by id.
    fn list_templates(
        &self,
        after: Option<TemplateId>,
        limit: usize,
    ) -> StoreResult<Vec<TemplateRecord>>;

    /// Latest versions of the given templates; unknown ids are skipped.
    fn latest_templates(&self, ids: &[TemplateId]) -> StoreResult<Vec<TemplateRecord>> {
        let mut records = Vec::new();
        for id in ids {
            if let Some(record) = self.latest_template(*id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn commit_template_version(&self, commit: TemplateVersionCommit) -> StoreResult<()>;
}

/// Object, element and link rows.
///
/// Same invariants as [`TemplateStore`], plus: every link of a committed
/// object version refers to an element row that exists, and an object
/// version has at most one link per element id.
pub trait ObjectStore: Send + Sync {
    fn latest_object(&self, id: ObjectId) -> StoreResult<Option<ObjectRecord>>;

    fn object_version(
        &self,
        id: ObjectId,
        version_id: &VersionId,
    ) -> StoreResult<Option<ObjectRecord>>;

    /// Every version of `id`, newest first.
    fn object_versions(&self, id: ObjectId) -> StoreResult<Vec<ObjectRecord>>;

    fn object_exists(&self, id: ObjectId) -> StoreResult<bool> {
        Ok(self.latest_object(id)?.is_some())
    }

    /// Latest versions of up to `limit` objects with ids greater than
    /// `after`, ascending by id.
    fn list_objects(&self, after: Option<ObjectId>, limit: usize) -> StoreResult<Vec<ObjectRecord>>;

    fn latest_objects(&self, ids: &[ObjectId]) -> StoreResult<Vec<ObjectRecord>> {
        let mut records = Vec::new();
        for id in ids {
            if let Some(record) = self.latest_object(*id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Link set of one object version, in commit order.
    fn object_links(
        &self,
        id: ObjectId,
        version_id: &VersionId,
    ) -> StoreResult<Vec<ObjectElementLinkRecord>>;

    fn element(
        &self,
        id: ElementId,
        version_id: &VersionId,
    ) -> StoreResult<Option<ObjectElementRecord>>;

    /// Element rows of one object version, resolved through its links.
    fn object_elements(
        &self,
        id: ObjectId,
        version_id: &VersionId,
    ) -> StoreResult<Vec<ObjectElementRecord>> {
        let mut elements = Vec::new();
        for link in self.object_links(id, version_id)? {
            if let Some(element) = self.element(link.element_id, &link.element_version_id)? {
                elements.push(element);
            }
        }
        Ok(elements)
    }

    fn commit_object_version(&self, commit: ObjectVersionCommit) -> StoreResult<()>;
}
