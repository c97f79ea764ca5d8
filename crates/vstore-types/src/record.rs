use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::author::AuthorInfo;
use crate::ids::{ObjectId, TemplateCode, TemplateId, VersionId};
use crate::value::ElementValue;

/// An id with the last-modified time of its latest version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyableRecord {
    pub id: i64,
    pub last_modified: DateTime<Utc>,
}

/// One page of a listing plus the token to request the next page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationContainer<T> {
    pub items: Vec<T>,
    pub continuation_token: Option<String>,
}

impl<T> ContinuationContainer<T> {
    pub fn new(items: Vec<T>, continuation_token: Option<String>) -> Self {
        Self {
            items,
            continuation_token,
        }
    }
}

/// Latest-version metadata of a template or object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadataRecord {
    pub id: i64,
    pub version_id: VersionId,
    pub last_modified: DateTime<Utc>,
    pub author: AuthorInfo,
}

/// One entry of a template's version history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersionRecord {
    pub id: TemplateId,
    pub version_id: VersionId,
    pub version_index: i64,
    pub last_modified: DateTime<Utc>,
    pub author: AuthorInfo,
    pub properties: Value,
    pub template_codes: Vec<TemplateCode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    pub template_code: TemplateCode,
    pub value: ElementValue,
}

/// One entry of an object's version history. `elements` is empty when the
/// history was requested without element values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectVersionRecord {
    pub id: ObjectId,
    pub version_id: VersionId,
    pub version_index: i64,
    pub template_id: TemplateId,
    pub template_version_id: VersionId,
    pub last_modified: DateTime<Utc>,
    pub author: AuthorInfo,
    pub properties: Value,
    pub elements: Vec<ElementRecord>,
    pub modified_elements: Vec<TemplateCode>,
}

/// Identity of an object's latest version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedObjectRef {
    pub id: ObjectId,
    pub version_id: VersionId,
    pub last_modified: DateTime<Utc>,
}
