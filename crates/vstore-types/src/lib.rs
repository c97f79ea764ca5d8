//! Foundation types for VStore.
//!
//! VStore keeps versioned *templates* (schemas of typed content elements with
//! per-language constraints) and *objects* (instances pinned to one template
//! version). This crate holds the shared vocabulary every other VStore crate
//! builds on.
//!
//! # Key Types
//!
//! - [`VersionId`]: opaque, server-generated token naming one version row
//! - [`Language`]: the language an object's content is written in
//! - [`ElementType`]: closed set of element kinds (text, images, links, ...)
//! - [`ConstraintSet`]: per-language [`ElementConstraints`] of an element
//! - [`ElementValue`]: the typed value an object element carries
//! - [`TemplateDescriptor`] / [`ObjectDescriptor`]: write-side payloads
//! - [`VersionedTemplateDescriptor`] / [`VersionedObjectDescriptor`]: read-side views
//! - [`BinaryMetadata`]: filename/size/content type of an uploaded binary

pub mod author;
pub mod binary;
pub mod constraints;
pub mod descriptor;
pub mod element;
pub mod error;
pub mod ids;
pub mod language;
pub mod record;
pub mod value;

pub use author::AuthorInfo;
pub use binary::BinaryMetadata;
pub use constraints::{
    ArticleElementConstraints, BinaryElementConstraints, BitmapImageElementConstraints,
    ColorElementConstraints, CompositeBitmapImageElementConstraints, ConstraintSet,
    ConstraintSetItem, DateElementConstraints, ElementConstraints, LinkElementConstraints,
    PhoneElementConstraints, ScalableBitmapImageElementConstraints, TextElementConstraints,
    VectorImageElementConstraints,
};
pub use descriptor::{
    ElementDescriptor, ElementShape, ObjectDescriptor, ObjectElementDescriptor,
    ObjectElementPersistenceDescriptor, ObjectMetadata, ObjectPersistenceDescriptor,
    TemplateDescriptor, VersionedObjectDescriptor, VersionedTemplateDescriptor,
};
pub use element::{ElementType, FileFormat, ImageSize, ImageSizeRange};
pub use error::TypeError;
pub use ids::{ElementId, ObjectId, TemplateCode, TemplateId, VersionId};
pub use language::Language;
pub use record::{
    ContinuationContainer, ElementRecord, IdentifyableRecord, ObjectMetadataRecord,
    ObjectVersionRecord, TemplateVersionRecord, VersionedObjectRef,
};
pub use value::{
    Anchor, BinaryElementValue, ColorElementValue, CompositeBitmapImageElementValue, CropArea,
    DateElementValue, ElementValue, FasElementValue, PhoneElementValue,
    ScalableBitmapImageElementValue, SizeSpecificImage, TextElementValue,
};
