use serde::{Deserialize, Serialize};

use crate::element::{ElementType, FileFormat, ImageSize, ImageSizeRange};
use crate::language::Language;

// ---------------------------------------------------------------------------
// Per-type constraints
// ---------------------------------------------------------------------------

/// Constraints for plain, formatted and fas-comment text.
///
/// Every bound is optional; an absent bound is not enforced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElementConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_symbols: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_symbols_per_word: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkElementConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_symbols: Option<i32>,
}

/// Limits shared by every binary-bearing element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryElementConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_filename_length: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_file_formats: Option<Vec<FileFormat>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitmapImageElementConstraints {
    #[serde(flatten)]
    pub binary: BinaryElementConstraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_image_sizes: Option<Vec<ImageSize>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorImageElementConstraints {
    #[serde(flatten)]
    pub binary: BinaryElementConstraints,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleElementConstraints {
    #[serde(flatten)]
    pub binary: BinaryElementConstraints,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalableBitmapImageElementConstraints {
    #[serde(flatten)]
    pub binary: BinaryElementConstraints,
    #[serde(default)]
    pub image_size_range: ImageSizeRange,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeBitmapImageElementConstraints {
    #[serde(flatten)]
    pub binary: BinaryElementConstraints,
    #[serde(default)]
    pub image_size_range: ImageSizeRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_specific_image_max_size: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneElementConstraints {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorElementConstraints {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateElementConstraints {}

// ---------------------------------------------------------------------------
// ElementConstraints
// ---------------------------------------------------------------------------

/// Type-specific constraints of an element for one language.
///
/// Fas-comments share the plain-text variant and video links share the link
/// variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementConstraints {
    PlainText(TextElementConstraints),
    FormattedText(TextElementConstraints),
    Link(LinkElementConstraints),
    BitmapImage(BitmapImageElementConstraints),
    VectorImage(VectorImageElementConstraints),
    Article(ArticleElementConstraints),
    ScalableBitmapImage(ScalableBitmapImageElementConstraints),
    CompositeBitmapImage(CompositeBitmapImageElementConstraints),
    Phone(PhoneElementConstraints),
    Color(ColorElementConstraints),
    Date(DateElementConstraints),
}

impl ElementConstraints {
    /// Whether this constraint variant may describe an element of `element_type`.
    pub fn belongs_to(&self, element_type: ElementType) -> bool {
        matches!(
            (self, element_type),
            (ElementConstraints::PlainText(_), ElementType::PlainText)
                | (ElementConstraints::PlainText(_), ElementType::FasComment)
                | (ElementConstraints::FormattedText(_), ElementType::FormattedText)
                | (ElementConstraints::Link(_), ElementType::Link)
                | (ElementConstraints::Link(_), ElementType::VideoLink)
                | (ElementConstraints::BitmapImage(_), ElementType::BitmapImage)
                | (ElementConstraints::VectorImage(_), ElementType::VectorImage)
                | (ElementConstraints::Article(_), ElementType::Article)
                | (
                    ElementConstraints::ScalableBitmapImage(_),
                    ElementType::ScalableBitmapImage
                )
                | (
                    ElementConstraints::CompositeBitmapImage(_),
                    ElementType::CompositeBitmapImage
                )
                | (ElementConstraints::Phone(_), ElementType::Phone)
                | (ElementConstraints::Color(_), ElementType::Color)
                | (ElementConstraints::Date(_), ElementType::Date)
        )
    }

    /// Default (unbounded) constraints for an element type, with the type's
    /// full format whitelist for binary types.
    pub fn default_for(element_type: ElementType) -> Self {
        let binary = || BinaryElementConstraints {
            max_size: None,
            max_filename_length: None,
            supported_file_formats: Some(element_type.supported_file_formats().to_vec()),
        };
        match element_type {
            ElementType::PlainText | ElementType::FasComment => {
                ElementConstraints::PlainText(TextElementConstraints::default())
            }
            ElementType::FormattedText => {
                ElementConstraints::FormattedText(TextElementConstraints::default())
            }
            ElementType::Link | ElementType::VideoLink => {
                ElementConstraints::Link(LinkElementConstraints::default())
            }
            ElementType::BitmapImage => {
                ElementConstraints::BitmapImage(BitmapImageElementConstraints {
                    binary: binary(),
                    supported_image_sizes: None,
                })
            }
            ElementType::VectorImage => {
                ElementConstraints::VectorImage(VectorImageElementConstraints { binary: binary() })
            }
            ElementType::Article => {
                ElementConstraints::Article(ArticleElementConstraints { binary: binary() })
            }
            ElementType::ScalableBitmapImage => {
                ElementConstraints::ScalableBitmapImage(ScalableBitmapImageElementConstraints {
                    binary: binary(),
                    image_size_range: ImageSizeRange::default(),
                })
            }
            ElementType::CompositeBitmapImage => {
                ElementConstraints::CompositeBitmapImage(CompositeBitmapImageElementConstraints {
                    binary: binary(),
                    image_size_range: ImageSizeRange::default(),
                    size_specific_image_max_size: None,
                })
            }
            ElementType::Phone => ElementConstraints::Phone(PhoneElementConstraints::default()),
            ElementType::Color => ElementConstraints::Color(ColorElementConstraints::default()),
            ElementType::Date => ElementConstraints::Date(DateElementConstraints::default()),
        }
    }

    pub fn as_text(&self) -> Option<&TextElementConstraints> {
        match self {
            ElementConstraints::PlainText(c) | ElementConstraints::FormattedText(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&LinkElementConstraints> {
        match self {
            ElementConstraints::Link(c) => Some(c),
            _ => None,
        }
    }

    /// Shared binary limits, for binary-bearing variants.
    pub fn as_binary(&self) -> Option<&BinaryElementConstraints> {
        match self {
            ElementConstraints::BitmapImage(c) => Some(&c.binary),
            ElementConstraints::VectorImage(c) => Some(&c.binary),
            ElementConstraints::Article(c) => Some(&c.binary),
            ElementConstraints::ScalableBitmapImage(c) => Some(&c.binary),
            ElementConstraints::CompositeBitmapImage(c) => Some(&c.binary),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ConstraintSet
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintSetItem {
    pub language: Language,
    pub constraints: ElementConstraints,
}

impl ConstraintSetItem {
    pub fn new(language: Language, constraints: ElementConstraints) -> Self {
        Self {
            language,
            constraints,
        }
    }
}

/// Per-language constraints of one element.
///
/// Equality is structural and ignores item order.
#[derive(Clone, Debug, Default, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintSet(Vec<ConstraintSetItem>);

impl ConstraintSet {
    pub fn new(items: Vec<ConstraintSetItem>) -> Self {
        Self(items)
    }

    /// A set holding a single `Unspecified` entry that applies to every language.
    pub fn unspecified(constraints: ElementConstraints) -> Self {
        Self(vec![ConstraintSetItem::new(Language::Unspecified, constraints)])
    }

    pub fn items(&self) -> &[ConstraintSetItem] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, language: Language, constraints: ElementConstraints) {
        self.0.push(ConstraintSetItem::new(language, constraints));
    }

    /// Constraints for `language`, falling back to the `Unspecified` entry.
    pub fn for_language(&self, language: Language) -> Option<&ElementConstraints> {
        self.0
            .iter()
            .find(|item| item.language == language)
            .or_else(|| {
                self.0
                    .iter()
                    .find(|item| item.language == Language::Unspecified)
            })
            .map(|item| &item.constraints)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConstraintSetItem> {
        self.0.iter()
    }
}

impl PartialEq for ConstraintSet {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().all(|item| other.0.contains(item))
            && other.0.iter().all(|item| self.0.contains(item))
    }
}

impl FromIterator<ConstraintSetItem> for ConstraintSet {
    fn from_iter<T: IntoIterator<Item = ConstraintSetItem>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(max: i32) -> ElementConstraints {
        ElementConstraints::PlainText(TextElementConstraints {
            max_symbols: Some(max),
            max_symbols_per_word: None,
            max_lines: None,
        })
    }

    #[test]
    fn language_fallback() {
        let set = ConstraintSet::new(vec![
            ConstraintSetItem::new(Language::Unspecified, text(10)),
            ConstraintSetItem::new(Language::Ru, text(20)),
        ]);
        assert_eq!(set.for_language(Language::Ru), Some(&text(20)));
        assert_eq!(set.for_language(Language::En), Some(&text(10)));
        assert!(ConstraintSet::default().for_language(Language::En).is_none());
    }

    #[test]
    fn equality_ignores_order() {
        let a = ConstraintSet::new(vec![
            ConstraintSetItem::new(Language::Ru, text(1)),
            ConstraintSetItem::new(Language::En, text(2)),
        ]);
        let b = ConstraintSet::new(vec![
            ConstraintSetItem::new(Language::En, text(2)),
            ConstraintSetItem::new(Language::Ru, text(1)),
        ]);
        let c = ConstraintSet::new(vec![ConstraintSetItem::new(Language::Ru, text(1))]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn belongs_to_aliases() {
        assert!(text(1).belongs_to(ElementType::FasComment));
        assert!(!text(1).belongs_to(ElementType::FormattedText));
        let link = ElementConstraints::default_for(ElementType::VideoLink);
        assert!(link.belongs_to(ElementType::Link));
        for t in ElementType::ALL {
            assert!(ElementConstraints::default_for(t).belongs_to(t));
        }
    }

    #[test]
    fn binary_constraints_serialize_flat() {
        let c = ElementConstraints::BitmapImage(BitmapImageElementConstraints {
            binary: BinaryElementConstraints {
                max_size: Some(1024),
                max_filename_length: Some(64),
                supported_file_formats: Some(vec![FileFormat::Png]),
            },
            supported_image_sizes: Some(vec![ImageSize::new(64, 48)]),
        });
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["bitmapImage"]["maxSize"], 1024);
        assert_eq!(json["bitmapImage"]["supportedFileFormats"][0], "png");
        let back: ElementConstraints = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
