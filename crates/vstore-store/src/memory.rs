use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::RwLock;

use tracing::debug;
use vstore_types::{ElementId, ObjectId, TemplateId, VersionId};

use crate::error::{StoreError, StoreResult};
use crate::records::{
    ObjectElementLinkRecord, ObjectElementRecord, ObjectRecord, ObjectVersionCommit,
    TemplateRecord, TemplateVersionCommit, VersionHead,
};
use crate::traits::{ObjectStore, TemplateStore};

/// Checks a new version against the stored chain: the caller's expected
/// latest must match, the index must follow the latest, and the version id
/// must be unused.
fn check_next_version(
    id: i64,
    chain: impl Iterator<Item = VersionHead> + Clone,
    expected_previous: Option<&VersionId>,
    new_head: &VersionHead,
) -> StoreResult<()> {
    let latest = chain.clone().max_by_key(|head| head.version_index);
    let actual = latest.as_ref().map(|head| head.version_id.clone());
    if actual.as_ref() != expected_previous {
        return Err(StoreError::Conflict {
            id,
            expected: expected_previous.cloned(),
            actual,
        });
    }

    let expected_index = latest.map(|head| head.version_index + 1).unwrap_or(0);
    if new_head.version_index != expected_index {
        return Err(StoreError::InvalidCommit {
            id,
            reason: format!(
                "version index {} does not follow latest (expected {expected_index})",
                new_head.version_index
            ),
        });
    }

    let mut chain = chain;
    if chain.any(|head| head.version_id == new_head.version_id) {
        return Err(StoreError::Duplicate {
            id,
            reason: format!("version id {} already used", new_head.version_id),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// In-memory template table.
///
/// Intended for tests and embedding. Versions are kept per id in index order
/// behind a `RwLock`.
pub struct InMemoryTemplateStore {
    versions: RwLock<BTreeMap<TemplateId, Vec<TemplateRecord>>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self {
            versions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Total number of template version rows.
    pub fn row_count(&self) -> StoreResult<usize> {
        let map = self.versions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().map(Vec::len).sum())
    }
}

impl Default for InMemoryTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryTemplateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.row_count().unwrap_or_default();
        f.debug_struct("InMemoryTemplateStore")
            .field("rows", &rows)
            .finish()
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn latest_template(&self, id: TemplateId) -> StoreResult<Option<TemplateRecord>> {
        let map = self.versions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&id).and_then(|chain| chain.last()).cloned())
    }

    fn template_version(
        &self,
        id: TemplateId,
        version_id: &VersionId,
    ) -> StoreResult<Option<TemplateRecord>> {
        let map = self.versions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .get(&id)
            .and_then(|chain| chain.iter().find(|r| &r.version_id == version_id))
            .cloned())
    }

    fn template_versions(&self, id: TemplateId) -> StoreResult<Vec<TemplateRecord>> {
        let map = self.versions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .get(&id)
            .map(|chain| chain.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn list_templates(
        &self,
        after: Option<TemplateId>,
        limit: usize,
    ) -> StoreResult<Vec<TemplateRecord>> {
        let map = self.versions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .iter()
            .filter(|(id, _)| after.map_or(true, |after| **id > after))
            .filter_map(|(_, chain)| chain.last().cloned())
            .take(limit)
            .collect())
    }

    fn commit_template_version(&self, commit: TemplateVersionCommit) -> StoreResult<()> {
        let mut map = self.versions.write().map_err(|_| StoreError::Poisoned)?;
        let record = commit.record;
        let chain = map.get(&record.id).map(Vec::as_slice).unwrap_or_default();
        check_next_version(
            record.id,
            chain.iter().map(TemplateRecord::head),
            commit.expected_previous.as_ref(),
            &record.head(),
        )?;
        debug!(
            id = record.id,
            version_id = %record.version_id,
            version_index = record.version_index,
            "template version stored"
        );
        map.entry(record.id).or_default().push(record);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ObjectTables {
    versions: BTreeMap<ObjectId, Vec<ObjectRecord>>,
    elements: HashMap<(ElementId, VersionId), ObjectElementRecord>,
    links: HashMap<(ObjectId, VersionId), Vec<ObjectElementLinkRecord>>,
}

impl ObjectTables {
    fn check_commit(&self, commit: &ObjectVersionCommit) -> StoreResult<()> {
        let object = &commit.object;
        let id = object.id;
        let chain = self.versions.get(&id).map(Vec::as_slice).unwrap_or_default();
        check_next_version(
            id,
            chain.iter().map(ObjectRecord::head),
            commit.expected_previous.as_ref(),
            &object.head(),
        )?;

        let mut new_elements = HashSet::new();
        for element in &commit.elements {
            let key = (element.id, element.version_id.clone());
            if self.elements.contains_key(&key) || !new_elements.insert(key) {
                return Err(StoreError::Duplicate {
                    id,
                    reason: format!(
                        "element {} version {} already stored",
                        element.id, element.version_id
                    ),
                });
            }
        }

        let mut linked = HashSet::new();
        for link in &commit.links {
            if link.object_id != id || link.object_version_id != object.version_id {
                return Err(StoreError::InvalidCommit {
                    id,
                    reason: format!("link for element {} targets another version", link.element_id),
                });
            }
            if !linked.insert(link.element_id) {
                return Err(StoreError::InvalidCommit {
                    id,
                    reason: format!("element {} linked twice", link.element_id),
                });
            }
            let key = (link.element_id, link.element_version_id.clone());
            if !new_elements.contains(&key) && !self.elements.contains_key(&key) {
                return Err(StoreError::InvalidCommit {
                    id,
                    reason: format!(
                        "link to missing element {} version {}",
                        link.element_id, link.element_version_id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// In-memory object, element and link tables.
///
/// Intended for tests and embedding. A commit validates against the current
/// tables and applies every row under one write lock, so readers observe
/// either the whole version or none of it.
pub struct InMemoryObjectStore {
    tables: RwLock<ObjectTables>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(ObjectTables::default()),
        }
    }

    /// Number of object version rows.
    pub fn object_row_count(&self) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.versions.values().map(Vec::len).sum())
    }

    /// Number of element version rows.
    pub fn element_row_count(&self) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.elements.len())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_rows", &self.object_row_count().unwrap_or_default())
            .field("element_rows", &self.element_row_count().unwrap_or_default())
            .finish()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn latest_object(&self, id: ObjectId) -> StoreResult<Option<ObjectRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.versions.get(&id).and_then(|chain| chain.last()).cloned())
    }

    fn object_version(
        &self,
        id: ObjectId,
        version_id: &VersionId,
    ) -> StoreResult<Option<ObjectRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables
            .versions
            .get(&id)
            .and_then(|chain| chain.iter().find(|r| &r.version_id == version_id))
            .cloned())
    }

    fn object_versions(&self, id: ObjectId) -> StoreResult<Vec<ObjectRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables
            .versions
            .get(&id)
            .map(|chain| chain.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn list_objects(&self, after: Option<ObjectId>, limit: usize) -> StoreResult<Vec<ObjectRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables
            .versions
            .iter()
            .filter(|(id, _)| after.map_or(true, |after| **id > after))
            .filter_map(|(_, chain)| chain.last().cloned())
            .take(limit)
            .collect())
    }

    fn object_links(
        &self,
        id: ObjectId,
        version_id: &VersionId,
    ) -> StoreResult<Vec<ObjectElementLinkRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables
            .links
            .get(&(id, version_id.clone()))
            .cloned()
            .unwrap_or_default())
    }

    fn element(
        &self,
        id: ElementId,
        version_id: &VersionId,
    ) -> StoreResult<Option<ObjectElementRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.elements.get(&(id, version_id.clone())).cloned())
    }

    fn commit_object_version(&self, commit: ObjectVersionCommit) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        tables.check_commit(&commit)?;

        let ObjectVersionCommit {
            object,
            elements,
            links,
            ..
        } = commit;
        debug!(
            id = object.id,
            version_id = %object.version_id,
            version_index = object.version_index,
            new_elements = elements.len(),
            links = links.len(),
            "object version stored"
        );
        for element in elements {
            tables
                .elements
                .insert((element.id, element.version_id.clone()), element);
        }
        tables
            .links
            .insert((object.id, object.version_id.clone()), links);
        tables.versions.entry(object.id).or_default().push(object);
        Ok(())
    }
}
