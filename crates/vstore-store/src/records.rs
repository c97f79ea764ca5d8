use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vstore_types::{
    AuthorInfo, ElementId, ObjectElementPersistenceDescriptor, ObjectId,
    ObjectPersistenceDescriptor, TemplateCode, TemplateDescriptor, TemplateId, VersionId,
};

use crate::codec;
use crate::error::StoreResult;

/// Identity of the latest version of a template or object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHead {
    pub version_id: VersionId,
    pub version_index: i64,
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One template version. `data` holds the JSON [`TemplateDescriptor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: TemplateId,
    pub version_id: VersionId,
    pub version_index: i64,
    pub last_modified: DateTime<Utc>,
    pub author: AuthorInfo,
    pub data: String,
}

impl TemplateRecord {
    pub fn head(&self) -> VersionHead {
        VersionHead {
            version_id: self.version_id.clone(),
            version_index: self.version_index,
        }
    }

    pub fn descriptor(&self) -> StoreResult<TemplateDescriptor> {
        codec::decode(&self.data)
    }
}

/// One object version. `data` holds the JSON [`ObjectPersistenceDescriptor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub version_id: VersionId,
    pub version_index: i64,
    pub template_id: TemplateId,
    pub template_version_id: VersionId,
    pub last_modified: DateTime<Utc>,
    pub author: AuthorInfo,
    pub modified_elements: Vec<TemplateCode>,
    pub data: String,
}

impl ObjectRecord {
    pub fn head(&self) -> VersionHead {
        VersionHead {
            version_id: self.version_id.clone(),
            version_index: self.version_index,
        }
    }

    pub fn descriptor(&self) -> StoreResult<ObjectPersistenceDescriptor> {
        codec::decode(&self.data)
    }
}

/// One element version. `data` holds the JSON
/// [`ObjectElementPersistenceDescriptor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectElementRecord {
    pub id: ElementId,
    pub version_id: VersionId,
    pub last_modified: DateTime<Utc>,
    pub data: String,
}

impl ObjectElementRecord {
    pub fn descriptor(&self) -> StoreResult<ObjectElementPersistenceDescriptor> {
        codec::decode(&self.data)
    }
}

/// Binds an object version to the element version it carries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectElementLinkRecord {
    pub object_id: ObjectId,
    pub object_version_id: VersionId,
    pub element_id: ElementId,
    pub element_version_id: VersionId,
}

// ---------------------------------------------------------------------------
// Commits
// ---------------------------------------------------------------------------

/// A new template version.
///
/// `expected_previous` is the version the caller read as latest; `None` means
/// the caller expects no version to exist.
#[derive(Clone, Debug)]
pub struct TemplateVersionCommit {
    pub record: TemplateRecord,
    pub expected_previous: Option<VersionId>,
}

/// A new object version with its new element rows and full link set.
#[derive(Clone, Debug)]
pub struct ObjectVersionCommit {
    pub object: ObjectRecord,
    pub elements: Vec<ObjectElementRecord>,
    pub links: Vec<ObjectElementLinkRecord>,
    pub expected_previous: Option<VersionId>,
}
