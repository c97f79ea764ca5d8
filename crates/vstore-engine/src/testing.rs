//! Fixtures shared by the engine's tests.

use chrono::Duration;
use serde_json::json;
use vstore_types::{
    AuthorInfo, BinaryElementConstraints, BinaryElementValue, BitmapImageElementConstraints,
    ConstraintSet, ElementConstraints, ElementDescriptor, ElementType, ElementValue, FileFormat,
    ImageSize, Language, ObjectDescriptor, ObjectElementDescriptor, TemplateDescriptor,
    TemplateId, TextElementConstraints, TextElementValue, VersionId,
};

use crate::config::VStoreConfig;
use crate::vstore::{InMemoryBackends, VStore};

pub const TEXT_CODE: i32 = 100;
pub const IMAGE_CODE: i32 = 200;

pub fn harness() -> (VStore, InMemoryBackends) {
    VStore::in_memory(VStoreConfig {
        validation_concurrency: 2,
        ..VStoreConfig::default()
    })
}

pub fn author() -> AuthorInfo {
    AuthorInfo::new("editor").with_login("editor@example.com")
}

pub fn text_constraints(max_symbols: i32) -> ConstraintSet {
    ConstraintSet::unspecified(ElementConstraints::PlainText(TextElementConstraints {
        max_symbols: Some(max_symbols),
        max_symbols_per_word: None,
        max_lines: None,
    }))
}

pub fn image_constraints() -> ConstraintSet {
    ConstraintSet::unspecified(ElementConstraints::BitmapImage(BitmapImageElementConstraints {
        binary: BinaryElementConstraints {
            max_size: Some(4096),
            max_filename_length: Some(64),
            supported_file_formats: Some(vec![FileFormat::Png]),
        },
        supported_image_sizes: Some(vec![ImageSize::new(64, 48)]),
    }))
}

pub fn text_element(code: i32, max_symbols: i32) -> ElementDescriptor {
    ElementDescriptor::new(
        ElementType::PlainText,
        code,
        json!({"label": "Title"}),
        text_constraints(max_symbols),
    )
}

pub fn image_element(code: i32) -> ElementDescriptor {
    ElementDescriptor::new(ElementType::BitmapImage, code, json!({}), image_constraints())
}

pub fn template(elements: Vec<ElementDescriptor>) -> TemplateDescriptor {
    TemplateDescriptor {
        properties: json!({"name": "card"}),
        elements,
    }
}

/// Text element with id `code + 1`, shaped after `template_element`.
pub fn text_value(template_element: &ElementDescriptor, text: &str) -> ObjectElementDescriptor {
    ObjectElementDescriptor::for_template_element(
        i64::from(template_element.template_code) + 1,
        template_element,
        ElementValue::PlainText(TextElementValue::new(text)),
    )
}

/// Image element with id `code + 1`, shaped after `template_element`.
pub fn image_value(template_element: &ElementDescriptor, key: &str) -> ObjectElementDescriptor {
    ObjectElementDescriptor::for_template_element(
        i64::from(template_element.template_code) + 1,
        template_element,
        ElementValue::BitmapImage(BinaryElementValue::new(key)),
    )
}

pub fn object(
    template_id: TemplateId,
    template_version_id: &VersionId,
    elements: Vec<ObjectElementDescriptor>,
) -> ObjectDescriptor {
    ObjectDescriptor {
        template_id,
        template_version_id: template_version_id.clone(),
        language: Language::Ru,
        properties: Some(json!({"campaign": 7})),
        elements: Some(elements),
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    data
}

pub fn upload(backends: &InMemoryBackends, key: &str, filename: &str, content: Vec<u8>) {
    backends
        .binaries
        .register_upload(key, filename, "image/png", content, Duration::hours(1))
        .unwrap();
}
