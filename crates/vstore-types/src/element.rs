use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

// ---------------------------------------------------------------------------
// ElementType
// ---------------------------------------------------------------------------

/// Closed set of element kinds a template can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementType {
    PlainText,
    FormattedText,
    BitmapImage,
    VectorImage,
    ScalableBitmapImage,
    CompositeBitmapImage,
    Article,
    Link,
    VideoLink,
    Phone,
    Color,
    Date,
    FasComment,
}

impl ElementType {
    pub const ALL: [ElementType; 13] = [
        ElementType::PlainText,
        ElementType::FormattedText,
        ElementType::BitmapImage,
        ElementType::VectorImage,
        ElementType::ScalableBitmapImage,
        ElementType::CompositeBitmapImage,
        ElementType::Article,
        ElementType::Link,
        ElementType::VideoLink,
        ElementType::Phone,
        ElementType::Color,
        ElementType::Date,
        ElementType::FasComment,
    ];

    /// Returns `true` for types whose values reference uploaded binaries.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            ElementType::BitmapImage
                | ElementType::VectorImage
                | ElementType::ScalableBitmapImage
                | ElementType::CompositeBitmapImage
                | ElementType::Article
        )
    }

    /// Returns `true` for raster image types.
    pub fn is_image(self) -> bool {
        matches!(
            self,
            ElementType::BitmapImage
                | ElementType::ScalableBitmapImage
                | ElementType::CompositeBitmapImage
        )
    }

    /// Formats a binary element of this type may declare. Empty for
    /// non-binary types.
    pub fn supported_file_formats(self) -> &'static [FileFormat] {
        match self {
            ElementType::BitmapImage => &[FileFormat::Bmp, FileFormat::Gif, FileFormat::Png],
            ElementType::VectorImage => &[FileFormat::Pdf, FileFormat::Svg],
            ElementType::Article => &[FileFormat::Chm],
            ElementType::ScalableBitmapImage | ElementType::CompositeBitmapImage => &[
                FileFormat::Png,
                FileFormat::Gif,
                FileFormat::Jpg,
                FileFormat::Jpeg,
            ],
            _ => &[],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementType::PlainText => "plainText",
            ElementType::FormattedText => "formattedText",
            ElementType::BitmapImage => "bitmapImage",
            ElementType::VectorImage => "vectorImage",
            ElementType::ScalableBitmapImage => "scalableBitmapImage",
            ElementType::CompositeBitmapImage => "compositeBitmapImage",
            ElementType::Article => "article",
            ElementType::Link => "link",
            ElementType::VideoLink => "videoLink",
            ElementType::Phone => "phone",
            ElementType::Color => "color",
            ElementType::Date => "date",
            ElementType::FasComment => "fasComment",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TypeError::UnknownElementType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// FileFormat
// ---------------------------------------------------------------------------

/// File formats a binary element may accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Bmp,
    Gif,
    Png,
    Jpg,
    Jpeg,
    Pdf,
    Svg,
    Chm,
}

impl FileFormat {
    pub const ALL: [FileFormat; 8] = [
        FileFormat::Bmp,
        FileFormat::Gif,
        FileFormat::Png,
        FileFormat::Jpg,
        FileFormat::Jpeg,
        FileFormat::Pdf,
        FileFormat::Svg,
        FileFormat::Chm,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Bmp => "bmp",
            FileFormat::Gif => "gif",
            FileFormat::Png => "png",
            FileFormat::Jpg => "jpg",
            FileFormat::Jpeg => "jpeg",
            FileFormat::Pdf => "pdf",
            FileFormat::Svg => "svg",
            FileFormat::Chm => "chm",
        }
    }

    pub fn from_extension(ext: &str) -> Option<FileFormat> {
        let ext = ext.trim().trim_start_matches('.');
        FileFormat::ALL
            .iter()
            .copied()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// Format implied by a filename's extension.
    pub fn from_filename(filename: &str) -> Option<FileFormat> {
        let (stem, ext) = filename.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        FileFormat::from_extension(ext)
    }

    /// Content types an upload of this format may declare.
    pub fn content_types(self) -> &'static [&'static str] {
        match self {
            FileFormat::Bmp => &["image/bmp", "image/x-ms-bmp", "image/x-bmp"],
            FileFormat::Gif => &["image/gif"],
            FileFormat::Png => &["image/png"],
            FileFormat::Jpg | FileFormat::Jpeg => &["image/jpeg", "image/pjpeg"],
            FileFormat::Pdf => &["application/pdf"],
            FileFormat::Svg => &["image/svg+xml"],
            FileFormat::Chm => &[
                "application/vnd.ms-htmlhelp",
                "application/x-chm",
                "application/octet-stream",
            ],
        }
    }

    /// JPG and JPEG name the same encoding.
    pub fn same_encoding(self, other: FileFormat) -> bool {
        let canon = |f: FileFormat| if f == FileFormat::Jpg { FileFormat::Jpeg } else { f };
        canon(self) == canon(other)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileFormat::from_extension(s).ok_or_else(|| TypeError::UnknownFileFormat(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Image sizes
// ---------------------------------------------------------------------------

/// Pixel dimensions of an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: i32,
    pub height: i32,
}

impl ImageSize {
    pub const EMPTY: ImageSize = ImageSize {
        width: 0,
        height: 0,
    };

    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        *self == ImageSize::EMPTY
    }

    pub fn has_negative_dimension(&self) -> bool {
        self.width < 0 || self.height < 0
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Inclusive range of acceptable image sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSizeRange {
    pub min: ImageSize,
    pub max: ImageSize,
}

impl ImageSizeRange {
    pub const fn new(min: ImageSize, max: ImageSize) -> Self {
        Self { min, max }
    }

    /// Strictly ordered, positive bounds.
    pub fn is_consistent(&self) -> bool {
        self.min.width < self.max.width
            && self.min.height < self.max.height
            && self.min.width > 0
            && self.min.height > 0
    }

    pub fn contains(&self, size: ImageSize) -> bool {
        size.width >= self.min.width
            && size.height >= self.min.height
            && size.width <= self.max.width
            && size.height <= self.max.height
    }
}
