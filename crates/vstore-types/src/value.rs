use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::binary::BinaryMetadata;
use crate::element::{ElementType, ImageSize};

// ---------------------------------------------------------------------------
// Value payloads
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextElementValue {
    #[serde(default)]
    pub raw: String,
}

impl TextElementValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

/// Fas-comment: a preset code plus free text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FasElementValue {
    #[serde(default)]
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneElementValue {
    #[serde(default)]
    pub raw: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorElementValue {
    #[serde(default)]
    pub raw: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateElementValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

/// A single uploaded binary.
///
/// On the write side only `raw` (the file key) is set; the persisted form also
/// carries the resolved filename and size.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryElementValue {
    #[serde(default)]
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
}

impl BinaryElementValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            filename: None,
            filesize: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Anchor {
    #[default]
    Middle,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalableBitmapImageElementValue {
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropArea {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// A pre-rendered variant of a composite image for one target size.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSpecificImage {
    pub size: ImageSize,
    #[serde(default)]
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeBitmapImageElementValue {
    #[serde(default)]
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_area: Option<CropArea>,
    #[serde(default)]
    pub size_specific_images: Vec<SizeSpecificImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
}

// ---------------------------------------------------------------------------
// ElementValue
// ---------------------------------------------------------------------------

/// Typed value of an object element. The variant determines the element type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementValue {
    PlainText(TextElementValue),
    FormattedText(TextElementValue),
    BitmapImage(BinaryElementValue),
    VectorImage(BinaryElementValue),
    ScalableBitmapImage(ScalableBitmapImageElementValue),
    CompositeBitmapImage(CompositeBitmapImageElementValue),
    Article(BinaryElementValue),
    Link(TextElementValue),
    VideoLink(TextElementValue),
    Phone(PhoneElementValue),
    Color(ColorElementValue),
    Date(DateElementValue),
    FasComment(FasElementValue),
}

impl ElementValue {
    pub fn element_type(&self) -> ElementType {
        match self {
            ElementValue::PlainText(_) => ElementType::PlainText,
            ElementValue::FormattedText(_) => ElementType::FormattedText,
            ElementValue::BitmapImage(_) => ElementType::BitmapImage,
            ElementValue::VectorImage(_) => ElementType::VectorImage,
            ElementValue::ScalableBitmapImage(_) => ElementType::ScalableBitmapImage,
            ElementValue::CompositeBitmapImage(_) => ElementType::CompositeBitmapImage,
            ElementValue::Article(_) => ElementType::Article,
            ElementValue::Link(_) => ElementType::Link,
            ElementValue::VideoLink(_) => ElementType::VideoLink,
            ElementValue::Phone(_) => ElementType::Phone,
            ElementValue::Color(_) => ElementType::Color,
            ElementValue::Date(_) => ElementType::Date,
            ElementValue::FasComment(_) => ElementType::FasComment,
        }
    }

    /// Text subject to text rules (plain, formatted, link and fas-comment).
    pub fn text(&self) -> Option<&str> {
        match self {
            ElementValue::PlainText(v)
            | ElementValue::FormattedText(v)
            | ElementValue::Link(v)
            | ElementValue::VideoLink(v) => Some(&v.raw),
            ElementValue::FasComment(v) => v.text.as_deref(),
            _ => None,
        }
    }

    /// Main file key of a binary value, if any.
    pub fn raw_file_key(&self) -> Option<&str> {
        let raw = match self {
            ElementValue::BitmapImage(v) | ElementValue::VectorImage(v) | ElementValue::Article(v) => {
                &v.raw
            }
            ElementValue::ScalableBitmapImage(v) => &v.raw,
            ElementValue::CompositeBitmapImage(v) => &v.raw,
            _ => return None,
        };
        if raw.is_empty() {
            None
        } else {
            Some(raw)
        }
    }

    /// Every file key the value references: the main key followed by the
    /// size-specific variants of a composite image. Empty when the main key
    /// is unset.
    pub fn file_keys(&self) -> Vec<&str> {
        let Some(raw) = self.raw_file_key() else {
            return Vec::new();
        };
        let mut keys = vec![raw];
        if let ElementValue::CompositeBitmapImage(v) = self {
            keys.extend(
                v.size_specific_images
                    .iter()
                    .map(|image| image.raw.as_str())
                    .filter(|key| !key.is_empty()),
            );
        }
        keys
    }

    /// Persisted form: file keys are kept and the resolved filename and size
    /// are embedded next to them. Returns the value and the number of
    /// binaries it references.
    ///
    /// `resolve` must know every key in [`file_keys`](Self::file_keys);
    /// an unknown key yields `Err(key)`.
    pub fn to_persistence<'m, F>(&self, resolve: F) -> Result<(ElementValue, usize), String>
    where
        F: Fn(&str) -> Option<&'m BinaryMetadata>,
    {
        let lookup = |key: &str| resolve(key).ok_or_else(|| key.to_string());
        if self.raw_file_key().is_none() {
            return Ok(match self {
                ElementValue::BitmapImage(_)
                | ElementValue::VectorImage(_)
                | ElementValue::Article(_)
                | ElementValue::ScalableBitmapImage(_)
                | ElementValue::CompositeBitmapImage(_) => (self.emptied(), 0),
                _ => (self.clone(), 0),
            });
        }

        let converted = match self {
            ElementValue::BitmapImage(v) => {
                let meta = lookup(&v.raw)?;
                (ElementValue::BitmapImage(resolved(&v.raw, meta)), 1)
            }
            ElementValue::VectorImage(v) => {
                let meta = lookup(&v.raw)?;
                (ElementValue::VectorImage(resolved(&v.raw, meta)), 1)
            }
            ElementValue::Article(v) => {
                let meta = lookup(&v.raw)?;
                (ElementValue::Article(resolved(&v.raw, meta)), 1)
            }
            ElementValue::ScalableBitmapImage(v) => {
                let meta = lookup(&v.raw)?;
                let value = ScalableBitmapImageElementValue {
                    raw: v.raw.clone(),
                    anchor: v.anchor,
                    filename: Some(meta.filename.clone()),
                    filesize: Some(meta.file_size),
                };
                (ElementValue::ScalableBitmapImage(value), 1)
            }
            ElementValue::CompositeBitmapImage(v) => {
                let meta = lookup(&v.raw)?;
                let images = v
                    .size_specific_images
                    .iter()
                    .filter(|image| !image.raw.is_empty())
                    .map(|image| {
                        let image_meta = lookup(&image.raw)?;
                        Ok(SizeSpecificImage {
                            size: image.size,
                            raw: image.raw.clone(),
                            filename: Some(image_meta.filename.clone()),
                            filesize: Some(image_meta.file_size),
                        })
                    })
                    .collect::<Result<Vec<_>, String>>()?;
                let count = images.len() + 1;
                let value = CompositeBitmapImageElementValue {
                    raw: v.raw.clone(),
                    crop_area: v.crop_area,
                    size_specific_images: images,
                    filename: Some(meta.filename.clone()),
                    filesize: Some(meta.file_size),
                };
                (ElementValue::CompositeBitmapImage(value), count)
            }
            other => (other.clone(), 0),
        };
        Ok(converted)
    }

    /// The empty value of the same binary variant.
    fn emptied(&self) -> ElementValue {
        match self {
            ElementValue::BitmapImage(_) => ElementValue::BitmapImage(BinaryElementValue::default()),
            ElementValue::VectorImage(_) => ElementValue::VectorImage(BinaryElementValue::default()),
            ElementValue::Article(_) => ElementValue::Article(BinaryElementValue::default()),
            ElementValue::ScalableBitmapImage(v) => {
                ElementValue::ScalableBitmapImage(ScalableBitmapImageElementValue {
                    anchor: v.anchor,
                    ..Default::default()
                })
            }
            ElementValue::CompositeBitmapImage(_) => {
                ElementValue::CompositeBitmapImage(CompositeBitmapImageElementValue::default())
            }
            other => other.clone(),
        }
    }
}

fn resolved(raw: &str, meta: &BinaryMetadata) -> BinaryElementValue {
    BinaryElementValue {
        raw: raw.to_string(),
        filename: Some(meta.filename.clone()),
        filesize: Some(meta.file_size),
    }
}
