//! Checks of template element descriptors.
//!
//! Each element is checked independently and reports at most one violation:
//! the first check it fails. Absent optional bounds are not checked.

use std::collections::HashSet;

use tracing::debug;
use vstore_types::{
    BinaryElementConstraints, BitmapImageElementConstraints, ElementConstraints, ElementShape,
    ElementType, FileFormat, ImageSize, ImageSizeRange, TextElementConstraints,
};

use crate::error::{TemplateElementValidationKind as Kind, TemplateValidationError};

type Check = Result<(), Kind>;

fn ensure(condition: bool, kind: Kind) -> Check {
    if condition {
        Ok(())
    } else {
        Err(kind)
    }
}

/// Template element checker bound to the deployment's binary size limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemplateChecker {
    max_binary_size: i64,
}

impl TemplateChecker {
    pub fn new(max_binary_size: i64) -> Self {
        Self { max_binary_size }
    }

    pub fn max_binary_size(&self) -> i64 {
        self.max_binary_size
    }

    /// Check every element. A repeated template code is reported for each
    /// repetition after the first.
    pub fn check<E: ElementShape>(&self, elements: &[E]) -> Vec<TemplateValidationError> {
        let mut codes = HashSet::new();
        let errors: Vec<_> = elements
            .iter()
            .filter_map(|element| {
                let code = element.template_code();
                let result = if codes.insert(code) {
                    self.check_element(element)
                } else {
                    Err(Kind::NonUniqueTemplateCode)
                };
                result.err().map(|kind| TemplateValidationError::new(code, kind))
            })
            .collect();
        if !errors.is_empty() {
            debug!(count = errors.len(), "template elements rejected");
        }
        errors
    }

    /// Check one element's constraint set, item by item.
    pub fn check_element<E: ElementShape>(&self, element: &E) -> Check {
        let element_type = element.element_type();
        for item in element.constraints().iter() {
            ensure(
                item.constraints.belongs_to(element_type),
                Kind::ConstraintsTypeMismatch,
            )?;
            self.check_constraints(element_type, &item.constraints)?;
        }
        Ok(())
    }

    fn check_constraints(&self, element_type: ElementType, constraints: &ElementConstraints) -> Check {
        let whitelist = element_type.supported_file_formats();
        match constraints {
            ElementConstraints::PlainText(c) | ElementConstraints::FormattedText(c) => {
                check_text(c)
            }
            ElementConstraints::Link(c) => {
                ensure(c.max_symbols.map_or(true, |m| m > 0), Kind::NegativeMaxSymbols)
            }
            ElementConstraints::BitmapImage(c) => {
                self.check_binary(&c.binary)?;
                check_formats(&c.binary, whitelist, Kind::UnsupportedImageFileFormat)?;
                check_image_sizes(c)
            }
            ElementConstraints::VectorImage(c) => {
                self.check_binary(&c.binary)?;
                check_formats(&c.binary, whitelist, Kind::UnsupportedImageFileFormat)
            }
            ElementConstraints::Article(c) => {
                self.check_binary(&c.binary)?;
                check_formats(&c.binary, whitelist, Kind::UnsupportedArticleFileFormat)
            }
            ElementConstraints::ScalableBitmapImage(c) => {
                self.check_binary(&c.binary)?;
                check_formats(&c.binary, whitelist, Kind::UnsupportedImageFileFormat)?;
                check_range(&c.image_size_range)
            }
            ElementConstraints::CompositeBitmapImage(c) => {
                self.check_binary(&c.binary)?;
                ensure(
                    c.size_specific_image_max_size.map_or(true, |m| m > 0),
                    Kind::NegativeSizeSpecificImageMaxSize,
                )?;
                check_formats(&c.binary, whitelist, Kind::UnsupportedImageFileFormat)?;
                check_range(&c.image_size_range)
            }
            ElementConstraints::Phone(_)
            | ElementConstraints::Color(_)
            | ElementConstraints::Date(_) => Ok(()),
        }
    }

    fn check_binary(&self, c: &BinaryElementConstraints) -> Check {
        let formats = c
            .supported_file_formats
            .as_ref()
            .ok_or(Kind::MissingSupportedFileFormats)?;
        ensure(!formats.is_empty(), Kind::EmptySupportedFileFormats)?;
        ensure(
            c.max_filename_length.map_or(true, |m| m > 0),
            Kind::NegativeMaxFilenameLength,
        )?;
        ensure(c.max_size.map_or(true, |m| m > 0), Kind::NegativeMaxSize)?;
        ensure(
            c.max_size.map_or(true, |m| m <= self.max_binary_size),
            Kind::MaxSizeLimitExceeded,
        )
    }
}

fn check_text(c: &TextElementConstraints) -> Check {
    if let (Some(max_symbols), Some(per_word)) = (c.max_symbols, c.max_symbols_per_word) {
        ensure(max_symbols >= per_word, Kind::InvalidMaxSymbolsPerWord)?;
    }
    ensure(c.max_symbols.map_or(true, |m| m > 0), Kind::NegativeMaxSymbols)?;
    ensure(
        c.max_symbols_per_word.map_or(true, |m| m > 0),
        Kind::NegativeMaxSymbolsPerWord,
    )?;
    ensure(c.max_lines.map_or(true, |m| m > 0), Kind::NegativeMaxLines)
}

fn check_formats(c: &BinaryElementConstraints, whitelist: &[FileFormat], kind: Kind) -> Check {
    let formats = c.supported_file_formats.as_deref().unwrap_or_default();
    ensure(formats.iter().all(|f| whitelist.contains(f)), kind)
}

fn check_image_sizes(c: &BitmapImageElementConstraints) -> Check {
    let sizes = c
        .supported_image_sizes
        .as_ref()
        .ok_or(Kind::MissingSupportedImageSizes)?;
    ensure(!sizes.is_empty(), Kind::EmptySupportedImageSizes)?;
    ensure(!sizes.contains(&ImageSize::EMPTY), Kind::InvalidImageSize)?;
    ensure(
        !sizes.iter().any(ImageSize::has_negative_dimension),
        Kind::NegativeImageSizeDimension,
    )
}

fn check_range(range: &ImageSizeRange) -> Check {
    ensure(range.is_consistent(), Kind::InvalidImageSizeRange)
}

#[cfg(test)]
mod tests {
    use vstore_types::{
        ArticleElementConstraints, CompositeBitmapImageElementConstraints, ConstraintSet,
        ElementDescriptor, Language, LinkElementConstraints,
    };

    use super::*;

    const MAX: i64 = 10 * 1024 * 1024;

    fn element(code: i32, element_type: ElementType, constraints: ElementConstraints) -> ElementDescriptor {
        ElementDescriptor::new(
            element_type,
            code,
            serde_json::json!({}),
            ConstraintSet::unspecified(constraints),
        )
    }

    fn text(max_symbols: Option<i32>, per_word: Option<i32>, lines: Option<i32>) -> ElementConstraints {
        ElementConstraints::PlainText(TextElementConstraints {
            max_symbols,
            max_symbols_per_word: per_word,
            max_lines: lines,
        })
    }

    fn bitmap(sizes: Option<Vec<ImageSize>>) -> ElementConstraints {
        ElementConstraints::BitmapImage(BitmapImageElementConstraints {
            binary: BinaryElementConstraints {
                max_size: Some(1024),
                max_filename_length: Some(64),
                supported_file_formats: Some(vec![FileFormat::Png]),
            },
            supported_image_sizes: sizes,
        })
    }

    fn kind_of(constraints: ElementConstraints, element_type: ElementType) -> Option<Kind> {
        TemplateChecker::new(MAX)
            .check(&[element(1, element_type, constraints)])
            .first()
            .map(|e| e.kind)
    }

    #[test]
    fn valid_template_passes() {
        let elements = vec![
            element(1, ElementType::PlainText, text(Some(100), Some(10), Some(3))),
            element(2, ElementType::BitmapImage, bitmap(Some(vec![ImageSize::new(64, 48)]))),
            element(3, ElementType::Color, ElementConstraints::default_for(ElementType::Color)),
            element(4, ElementType::PlainText, text(None, None, None)),
        ];
        assert!(TemplateChecker::new(MAX).check(&elements).is_empty());
    }

    #[test]
    fn duplicate_codes_are_reported() {
        let elements = vec![
            element(1, ElementType::Phone, ElementConstraints::default_for(ElementType::Phone)),
            element(1, ElementType::Phone, ElementConstraints::default_for(ElementType::Phone)),
        ];
        assert_eq!(
            TemplateChecker::new(MAX).check(&elements),
            vec![TemplateValidationError::new(1, Kind::NonUniqueTemplateCode)]
        );
    }

    #[test]
    fn text_checks_follow_declared_order() {
        assert_eq!(
            kind_of(text(Some(5), Some(10), Some(0)), ElementType::PlainText),
            Some(Kind::InvalidMaxSymbolsPerWord)
        );
        assert_eq!(
            kind_of(text(Some(0), None, None), ElementType::PlainText),
            Some(Kind::NegativeMaxSymbols)
        );
        assert_eq!(
            kind_of(text(None, Some(-1), None), ElementType::PlainText),
            Some(Kind::NegativeMaxSymbolsPerWord)
        );
        assert_eq!(
            kind_of(text(None, None, Some(0)), ElementType::PlainText),
            Some(Kind::NegativeMaxLines)
        );
    }

    #[test]
    fn link_needs_positive_length() {
        let link = ElementConstraints::Link(LinkElementConstraints {
            max_symbols: Some(0),
        });
        assert_eq!(kind_of(link, ElementType::VideoLink), Some(Kind::NegativeMaxSymbols));
    }

    #[test]
    fn binary_limits() {
        let mut constraints = bitmap(Some(vec![ImageSize::new(1, 1)]));
        let ElementConstraints::BitmapImage(c) = &mut constraints else {
            unreachable!()
        };
        c.binary.max_size = Some(MAX + 1);
        assert_eq!(
            kind_of(constraints.clone(), ElementType::BitmapImage),
            Some(Kind::MaxSizeLimitExceeded)
        );

        let ElementConstraints::BitmapImage(c) = &mut constraints else {
            unreachable!()
        };
        c.binary.supported_file_formats = None;
        assert_eq!(
            kind_of(constraints, ElementType::BitmapImage),
            Some(Kind::MissingSupportedFileFormats)
        );
    }

    #[test]
    fn formats_must_fit_the_type() {
        let mut constraints = bitmap(Some(vec![ImageSize::new(1, 1)]));
        if let ElementConstraints::BitmapImage(c) = &mut constraints {
            c.binary.supported_file_formats = Some(vec![FileFormat::Png, FileFormat::Jpg]);
        }
        assert_eq!(
            kind_of(constraints, ElementType::BitmapImage),
            Some(Kind::UnsupportedImageFileFormat)
        );

        let article = ElementConstraints::Article(ArticleElementConstraints {
            binary: BinaryElementConstraints {
                max_size: None,
                max_filename_length: None,
                supported_file_formats: Some(vec![FileFormat::Pdf]),
            },
        });
        assert_eq!(
            kind_of(article, ElementType::Article),
            Some(Kind::UnsupportedArticleFileFormat)
        );
    }

    #[test]
    fn bitmap_sizes() {
        assert_eq!(kind_of(bitmap(None), ElementType::BitmapImage), Some(Kind::MissingSupportedImageSizes));
        assert_eq!(kind_of(bitmap(Some(vec![])), ElementType::BitmapImage), Some(Kind::EmptySupportedImageSizes));
        assert_eq!(
            kind_of(bitmap(Some(vec![ImageSize::EMPTY])), ElementType::BitmapImage),
            Some(Kind::InvalidImageSize)
        );
        assert_eq!(
            kind_of(bitmap(Some(vec![ImageSize::new(-1, 5)])), ElementType::BitmapImage),
            Some(Kind::NegativeImageSizeDimension)
        );
    }

    #[test]
    fn composite_range_and_variant_size() {
        let mut composite = CompositeBitmapImageElementConstraints {
            binary: BinaryElementConstraints {
                max_size: Some(1024),
                max_filename_length: Some(64),
                supported_file_formats: Some(vec![FileFormat::Png, FileFormat::Jpeg]),
            },
            image_size_range: ImageSizeRange::new(ImageSize::new(1, 1), ImageSize::new(100, 100)),
            size_specific_image_max_size: Some(0),
        };
        assert_eq!(
            kind_of(
                ElementConstraints::CompositeBitmapImage(composite.clone()),
                ElementType::CompositeBitmapImage
            ),
            Some(Kind::NegativeSizeSpecificImageMaxSize)
        );

        composite.size_specific_image_max_size = Some(512);
        composite.image_size_range = ImageSizeRange::new(ImageSize::new(10, 10), ImageSize::new(10, 20));
        assert_eq!(
            kind_of(
                ElementConstraints::CompositeBitmapImage(composite),
                ElementType::CompositeBitmapImage
            ),
            Some(Kind::InvalidImageSizeRange)
        );
    }

    #[test]
    fn constraints_must_match_the_element_type() {
        let mut constraints = ConstraintSet::default();
        constraints.push(Language::Ru, text(Some(10), None, None));
        constraints.push(Language::En, ElementConstraints::default_for(ElementType::Color));
        let element = ElementDescriptor::new(ElementType::PlainText, 9, serde_json::json!({}), constraints);
        assert_eq!(
            TemplateChecker::new(MAX).check_element(&element),
            Err(Kind::ConstraintsTypeMismatch)
        );
    }
}
