use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vstore_types::{FileFormat, ImageSize, ImageSizeRange, Language, TemplateCode};

// ---------------------------------------------------------------------------
// Object element errors
// ---------------------------------------------------------------------------

/// Constraint a validation error violates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintViolation {
    MaxLines,
    MaxSymbols,
    MaxSymbolsPerWord,
    WithoutControlChars,
    WithoutNonBreakingSpace,
    ValidHtml,
    SupportedTags,
    SupportedAttributes,
    SupportedListElements,
    NoEmptyLists,
    NoNestedLists,
    ValidLink,
    ValidColor,
    ValidCompositeImage,
    ValidDateRange,
    MaxSize,
    MaxFilenameLength,
    SupportedFileFormats,
    BinaryExists,
    ValidArticle,
    ValidImage,
    ConstraintsPresent,
}

/// Failure of one binary check against an element's constraints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BinaryValidationError {
    #[error("binary is {actual} bytes, limit is {max_size}")]
    BinaryTooLarge { max_size: i64, actual: u64 },

    #[error("filename is {actual} characters, limit is {max_length}")]
    FilenameTooLong { max_length: i32, actual: usize },

    #[error("file extension {extension:?} is not supported")]
    UnsupportedExtension { extension: Option<String> },

    #[error("content type {content_type} does not match extension {extension}")]
    ContentTypeMismatch {
        content_type: String,
        extension: String,
    },

    #[error("file header does not match any of {expected:?}")]
    InvalidHeader { expected: Vec<FileFormat> },

    #[error("file header is {actual}, extension says {declared}")]
    HeaderExtensionMismatch {
        declared: FileFormat,
        actual: FileFormat,
    },

    #[error("image content could not be decoded")]
    InvalidImage,

    #[error("image size {size} is not supported")]
    UnsupportedImageSize { size: ImageSize },

    #[error("image size {size} is outside {} - {}", .range.min, .range.max)]
    ImageSizeOutOfRange {
        size: ImageSize,
        range: ImageSizeRange,
    },

    #[error("size-specific image is {actual} bytes, limit is {max_size}")]
    SizeSpecificImageTooLarge { max_size: i64, actual: u64 },

    #[error("size-specific image is {actual}, declared {declared}")]
    SizeSpecificImageSizeMismatch {
        declared: ImageSize,
        actual: ImageSize,
    },

    #[error("article is not a valid compiled help file")]
    InvalidArticle,
}

impl BinaryValidationError {
    pub fn violation(&self) -> ConstraintViolation {
        match self {
            BinaryValidationError::BinaryTooLarge { .. }
            | BinaryValidationError::SizeSpecificImageTooLarge { .. } => ConstraintViolation::MaxSize,
            BinaryValidationError::FilenameTooLong { .. } => ConstraintViolation::MaxFilenameLength,
            BinaryValidationError::UnsupportedExtension { .. }
            | BinaryValidationError::ContentTypeMismatch { .. }
            | BinaryValidationError::InvalidHeader { .. }
            | BinaryValidationError::HeaderExtensionMismatch { .. } => {
                ConstraintViolation::SupportedFileFormats
            }
            BinaryValidationError::InvalidArticle => ConstraintViolation::ValidArticle,
            BinaryValidationError::InvalidImage
            | BinaryValidationError::UnsupportedImageSize { .. }
            | BinaryValidationError::ImageSizeOutOfRange { .. }
            | BinaryValidationError::SizeSpecificImageSizeMismatch { .. } => {
                ConstraintViolation::ValidImage
            }
        }
    }
}

/// Failure of one content rule, or of binary resolution/checks, for an
/// object element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ElementValidationError {
    #[error("text is {actual} symbols, limit is {max_symbols}")]
    TextTooLong { max_symbols: i32, actual: usize },

    #[error("{} words exceed {max_symbols_per_word} symbols", .words.len())]
    WordsTooLong {
        max_symbols_per_word: i32,
        words: Vec<String>,
    },

    #[error("text has {actual} lines, limit is {max_lines}")]
    TooManyLines { max_lines: i32, actual: usize },

    #[error("text contains control characters")]
    ControlCharacters,

    #[error("text contains non-breaking spaces")]
    NonBreakingSpace,

    #[error("invalid html: {reason}")]
    InvalidHtml { reason: String },

    #[error("unsupported tags: {tags:?}")]
    UnsupportedTags { tags: Vec<String> },

    #[error("tags must not carry attributes: {tags:?}")]
    UnsupportedAttributes { tags: Vec<String> },

    #[error("list contains unsupported elements: {tags:?}")]
    UnsupportedListElements { tags: Vec<String> },

    #[error("list has no items")]
    EmptyList,

    #[error("lists must not be nested")]
    NestedList,

    #[error("link must be an absolute http(s) URL with a DNS host")]
    IncorrectLink,

    #[error("color must be #RRGGBB")]
    InvalidColor,

    #[error("crop area is missing or invalid")]
    InvalidCropArea,

    #[error("size-specific image {size} is invalid: {reason}")]
    InvalidSizeSpecificImage { size: ImageSize, reason: String },

    #[error("date range begins after it ends")]
    InvalidDateRange,

    #[error("no constraints for language {language}")]
    MissingConstraints { language: Language },

    #[error("binary {file_key} not found or its upload session expired")]
    BinaryNotFound { file_key: String },

    #[error("binary {file_key}: {error}")]
    InvalidBinary {
        file_key: String,
        error: BinaryValidationError,
    },
}

impl ElementValidationError {
    pub fn violation(&self) -> ConstraintViolation {
        match self {
            ElementValidationError::TextTooLong { .. } => ConstraintViolation::MaxSymbols,
            ElementValidationError::WordsTooLong { .. } => ConstraintViolation::MaxSymbolsPerWord,
            ElementValidationError::TooManyLines { .. } => ConstraintViolation::MaxLines,
            ElementValidationError::ControlCharacters => ConstraintViolation::WithoutControlChars,
            ElementValidationError::NonBreakingSpace => ConstraintViolation::WithoutNonBreakingSpace,
            ElementValidationError::InvalidHtml { .. } => ConstraintViolation::ValidHtml,
            ElementValidationError::UnsupportedTags { .. } => ConstraintViolation::SupportedTags,
            ElementValidationError::UnsupportedAttributes { .. } => {
                ConstraintViolation::SupportedAttributes
            }
            ElementValidationError::UnsupportedListElements { .. } => {
                ConstraintViolation::SupportedListElements
            }
            ElementValidationError::EmptyList => ConstraintViolation::NoEmptyLists,
            ElementValidationError::NestedList => ConstraintViolation::NoNestedLists,
            ElementValidationError::IncorrectLink => ConstraintViolation::ValidLink,
            ElementValidationError::InvalidColor => ConstraintViolation::ValidColor,
            ElementValidationError::InvalidCropArea
            | ElementValidationError::InvalidSizeSpecificImage { .. } => {
                ConstraintViolation::ValidCompositeImage
            }
            ElementValidationError::InvalidDateRange => ConstraintViolation::ValidDateRange,
            ElementValidationError::MissingConstraints { .. } => {
                ConstraintViolation::ConstraintsPresent
            }
            ElementValidationError::BinaryNotFound { .. } => ConstraintViolation::BinaryExists,
            ElementValidationError::InvalidBinary { error, .. } => error.violation(),
        }
    }
}

/// Every violation found in an object, keyed by template code.
pub type ObjectValidationErrors = BTreeMap<TemplateCode, Vec<ElementValidationError>>;

/// Merge `other` into `into`, appending per template code.
pub fn merge_errors(into: &mut ObjectValidationErrors, other: ObjectValidationErrors) {
    for (code, errors) in other {
        into.entry(code).or_default().extend(errors);
    }
}

// ---------------------------------------------------------------------------
// Template errors
// ---------------------------------------------------------------------------

/// Why a template element descriptor was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateElementValidationKind {
    NonUniqueTemplateCode,
    ConstraintsTypeMismatch,
    InvalidMaxSymbolsPerWord,
    NegativeMaxSymbols,
    NegativeMaxSymbolsPerWord,
    NegativeMaxLines,
    MissingSupportedFileFormats,
    EmptySupportedFileFormats,
    NegativeMaxFilenameLength,
    NegativeMaxSize,
    MaxSizeLimitExceeded,
    UnsupportedArticleFileFormat,
    UnsupportedImageFileFormat,
    MissingSupportedImageSizes,
    EmptySupportedImageSizes,
    InvalidImageSize,
    NegativeImageSizeDimension,
    InvalidImageSizeRange,
    NegativeSizeSpecificImageMaxSize,
}

/// A rejected template element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("template element {template_code}: {kind:?}")]
pub struct TemplateValidationError {
    pub template_code: TemplateCode,
    pub kind: TemplateElementValidationKind,
}

impl TemplateValidationError {
    pub fn new(template_code: TemplateCode, kind: TemplateElementValidationKind) -> Self {
        Self {
            template_code,
            kind,
        }
    }
}
