//! Checks of uploaded binaries against element constraints.
//!
//! Each upload goes through three ordered stages: metadata, file header and
//! file content. A failing stage stops the stages after it for that upload.
//! Size-specific variants of a composite image have their own, smaller set
//! of checks.

use vstore_types::{
    BinaryElementConstraints, BinaryMetadata, CompositeBitmapImageElementConstraints,
    ElementConstraints, ElementValue, FileFormat, ImageSize, ImageSizeRange,
};

use crate::error::{BinaryValidationError, ElementValidationError};
use crate::image;

/// An upload with its resolved metadata and content.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedBinary<'a> {
    pub metadata: &'a BinaryMetadata,
    pub content: &'a [u8],
}

type BinaryCheck = Result<(), BinaryValidationError>;

fn supported_formats(constraints: &BinaryElementConstraints) -> &[FileFormat] {
    constraints.supported_file_formats.as_deref().unwrap_or_default()
}

fn is_supported(formats: &[FileFormat], format: FileFormat) -> bool {
    formats.iter().any(|f| f.same_encoding(format))
}

fn exceeds_size(actual: u64, max_size: i64) -> bool {
    u64::try_from(max_size).map_or(true, |max| actual > max)
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

// ---- stage 1: metadata ----

/// Size, filename length, extension and content type. Returns the format
/// the filename declares.
pub fn check_metadata(
    constraints: &BinaryElementConstraints,
    metadata: &BinaryMetadata,
) -> Result<FileFormat, BinaryValidationError> {
    if let Some(max_size) = constraints.max_size {
        if exceeds_size(metadata.file_size, max_size) {
            return Err(BinaryValidationError::BinaryTooLarge {
                max_size,
                actual: metadata.file_size,
            });
        }
    }

    if let Some(max_length) = constraints.max_filename_length {
        let actual = metadata.filename.chars().count();
        if usize::try_from(max_length).map_or(true, |max| actual > max) {
            return Err(BinaryValidationError::FilenameTooLong { max_length, actual });
        }
    }

    let declared = FileFormat::from_filename(&metadata.filename)
        .filter(|format| is_supported(supported_formats(constraints), *format))
        .ok_or_else(|| BinaryValidationError::UnsupportedExtension {
            extension: metadata.extension(),
        })?;

    let content_type = media_type(&metadata.content_type);
    if !declared.content_types().contains(&content_type.as_str()) {
        return Err(BinaryValidationError::ContentTypeMismatch {
            content_type: metadata.content_type.clone(),
            extension: declared.extension().to_string(),
        });
    }
    Ok(declared)
}

// ---- stage 2: header ----

/// The leading bytes must name a supported format that agrees with the
/// declared extension.
pub fn check_header(
    supported: &[FileFormat],
    declared: FileFormat,
    content: &[u8],
) -> Result<FileFormat, BinaryValidationError> {
    let actual = image::detect_format(content)
        .filter(|format| is_supported(supported, *format))
        .ok_or_else(|| BinaryValidationError::InvalidHeader {
            expected: supported.to_vec(),
        })?;
    if !declared.same_encoding(actual) {
        return Err(BinaryValidationError::HeaderExtensionMismatch { declared, actual });
    }
    Ok(actual)
}

// ---- stage 3: content ----

fn dimensions(content: &[u8]) -> Result<ImageSize, BinaryValidationError> {
    image::decode_dimensions(content).ok_or(BinaryValidationError::InvalidImage)
}

fn check_article(content: &[u8]) -> BinaryCheck {
    // ITSF signature followed by a little-endian version of 2 or 3.
    let version = content
        .get(4..8)
        .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
        .map(u32::from_le_bytes);
    match version {
        Some(2 | 3) => Ok(()),
        _ => Err(BinaryValidationError::InvalidArticle),
    }
}

/// Structural checks for the element's type.
pub fn check_content(constraints: &ElementConstraints, content: &[u8]) -> BinaryCheck {
    match constraints {
        ElementConstraints::BitmapImage(c) => {
            let size = dimensions(content)?;
            match &c.supported_image_sizes {
                Some(sizes) if !sizes.contains(&size) => {
                    Err(BinaryValidationError::UnsupportedImageSize { size })
                }
                _ => Ok(()),
            }
        }
        ElementConstraints::ScalableBitmapImage(c) => check_range(c.image_size_range, content),
        ElementConstraints::CompositeBitmapImage(c) => check_range(c.image_size_range, content),
        ElementConstraints::Article(_) => check_article(content),
        _ => Ok(()),
    }
}

fn check_range(range: ImageSizeRange, content: &[u8]) -> BinaryCheck {
    let size = dimensions(content)?;
    if range.contains(size) {
        Ok(())
    } else {
        Err(BinaryValidationError::ImageSizeOutOfRange { size, range })
    }
}

/// All three stages for the main upload of an element.
pub fn check_binary(constraints: &ElementConstraints, binary: ResolvedBinary<'_>) -> BinaryCheck {
    let Some(limits) = constraints.as_binary() else {
        return Ok(());
    };
    let declared = check_metadata(limits, binary.metadata)?;
    check_header(supported_formats(limits), declared, binary.content)?;
    check_content(constraints, binary.content)
}

/// A pre-rendered variant of a composite image: size limit, a supported
/// header, and dimensions equal to the size it is declared for.
pub fn check_size_specific_image(
    constraints: &CompositeBitmapImageElementConstraints,
    declared_size: ImageSize,
    binary: ResolvedBinary<'_>,
) -> BinaryCheck {
    if let Some(max_size) = constraints.size_specific_image_max_size {
        if exceeds_size(binary.metadata.file_size, max_size) {
            return Err(BinaryValidationError::SizeSpecificImageTooLarge {
                max_size,
                actual: binary.metadata.file_size,
            });
        }
    }
    let supported = supported_formats(&constraints.binary);
    if !image::detect_format(binary.content).is_some_and(|f| is_supported(supported, f)) {
        return Err(BinaryValidationError::InvalidHeader {
            expected: supported.to_vec(),
        });
    }
    let actual = dimensions(binary.content)?;
    if actual != declared_size {
        return Err(BinaryValidationError::SizeSpecificImageSizeMismatch {
            declared: declared_size,
            actual,
        });
    }
    Ok(())
}

/// Run every binary check for `value`. Keys `lookup` cannot resolve are
/// skipped; they are reported as missing during resolution.
pub fn validate_binary_value<'a>(
    value: &ElementValue,
    constraints: &ElementConstraints,
    lookup: impl Fn(&str) -> Option<ResolvedBinary<'a>>,
) -> Vec<ElementValidationError> {
    let mut errors = Vec::new();
    let Some(main_key) = value.raw_file_key() else {
        return errors;
    };
    let mut report = |file_key: &str, result: BinaryCheck| {
        if let Err(error) = result {
            errors.push(ElementValidationError::InvalidBinary {
                file_key: file_key.to_string(),
                error,
            });
        }
    };

    if let Some(binary) = lookup(main_key) {
        report(main_key, check_binary(constraints, binary));
    }

    if let (ElementValue::CompositeBitmapImage(composite), ElementConstraints::CompositeBitmapImage(c)) =
        (value, constraints)
    {
        for image in composite.size_specific_images.iter().filter(|i| !i.raw.is_empty()) {
            if let Some(binary) = lookup(&image.raw) {
                report(&image.raw, check_size_specific_image(c, image.size, binary));
            }
        }
    }
    errors
}
