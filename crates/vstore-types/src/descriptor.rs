use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::author::AuthorInfo;
use crate::constraints::ConstraintSet;
use crate::element::ElementType;
use crate::ids::{ElementId, ObjectId, TemplateCode, TemplateId, VersionId};
use crate::language::Language;
use crate::value::ElementValue;

/// Shape shared by template and object elements: the parts that must agree
/// between an object and its template.
pub trait ElementShape {
    fn template_code(&self) -> TemplateCode;
    fn element_type(&self) -> ElementType;
    fn constraints(&self) -> &ConstraintSet;
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// One element slot of a template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub template_code: TemplateCode,
    #[serde(default)]
    pub properties: Value,
    pub constraints: ConstraintSet,
}

impl ElementDescriptor {
    pub fn new(
        element_type: ElementType,
        template_code: TemplateCode,
        properties: Value,
        constraints: ConstraintSet,
    ) -> Self {
        Self {
            element_type,
            template_code,
            properties,
            constraints,
        }
    }
}

impl ElementShape for ElementDescriptor {
    fn template_code(&self) -> TemplateCode {
        self.template_code
    }

    fn element_type(&self) -> ElementType {
        self.element_type
    }

    fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }
}

/// Write-side template payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub elements: Vec<ElementDescriptor>,
}

/// A template as stored at one version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedTemplateDescriptor {
    pub id: TemplateId,
    pub version_id: VersionId,
    pub version_index: i64,
    pub last_modified: DateTime<Utc>,
    pub author: AuthorInfo,
    pub properties: Value,
    pub elements: Vec<ElementDescriptor>,
}

impl VersionedTemplateDescriptor {
    pub fn element(&self, template_code: TemplateCode) -> Option<&ElementDescriptor> {
        self.elements
            .iter()
            .find(|e| e.template_code == template_code)
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// One element of an object. The element type follows from the value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectElementDescriptor {
    pub id: ElementId,
    pub template_code: TemplateCode,
    #[serde(default)]
    pub properties: Value,
    pub constraints: ConstraintSet,
    pub value: ElementValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<VersionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectElementDescriptor {
    pub fn new(
        id: ElementId,
        template_code: TemplateCode,
        constraints: ConstraintSet,
        value: ElementValue,
    ) -> Self {
        Self {
            id,
            template_code,
            properties: Value::Object(Default::default()),
            constraints,
            value,
            version_id: None,
            last_modified: None,
        }
    }

    /// Build an element for `template_element` carrying `value`.
    pub fn for_template_element(
        id: ElementId,
        template_element: &ElementDescriptor,
        value: ElementValue,
    ) -> Self {
        Self {
            id,
            template_code: template_element.template_code,
            properties: template_element.properties.clone(),
            constraints: template_element.constraints.clone(),
            value,
            version_id: None,
            last_modified: None,
        }
    }

    /// The part of the element that is persisted as element data.
    pub fn persistence(&self) -> ObjectElementPersistenceDescriptor {
        ObjectElementPersistenceDescriptor {
            element_type: self.value.element_type(),
            template_code: self.template_code,
            properties: self.properties.clone(),
            constraints: self.constraints.clone(),
            value: self.value.clone(),
        }
    }
}

impl ElementShape for ObjectElementDescriptor {
    fn template_code(&self) -> TemplateCode {
        self.template_code
    }

    fn element_type(&self) -> ElementType {
        self.value.element_type()
    }

    fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }
}

/// Write-side object payload.
///
/// `properties` and `elements` are optional on the wire so that a missing
/// field can be rejected as invalid input rather than defaulted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescriptor {
    pub template_id: TemplateId,
    #[serde(default)]
    pub template_version_id: VersionId,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub properties: Option<Value>,
    #[serde(default)]
    pub elements: Option<Vec<ObjectElementDescriptor>>,
}

/// Per-version metadata of an object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub author: AuthorInfo,
    pub modified_elements: Vec<TemplateCode>,
}

/// An object as stored at one version, elements resolved through its links.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedObjectDescriptor {
    pub id: ObjectId,
    pub version_id: VersionId,
    pub version_index: i64,
    pub last_modified: DateTime<Utc>,
    pub template_id: TemplateId,
    pub template_version_id: VersionId,
    pub language: Language,
    pub properties: Value,
    pub elements: Vec<ObjectElementDescriptor>,
    pub metadata: ObjectMetadata,
}

impl VersionedObjectDescriptor {
    pub fn element(&self, template_code: TemplateCode) -> Option<&ObjectElementDescriptor> {
        self.elements
            .iter()
            .find(|e| e.template_code == template_code)
    }
}

// ---------------------------------------------------------------------------
// Persistence forms
// ---------------------------------------------------------------------------

/// Object-level data persisted in an object row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPersistenceDescriptor {
    pub language: Language,
    pub properties: Value,
}

/// Element data persisted in an object element row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectElementPersistenceDescriptor {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub template_code: TemplateCode,
    pub properties: Value,
    pub constraints: ConstraintSet,
    pub value: ElementValue,
}
