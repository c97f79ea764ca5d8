//! File signature detection and image dimension decoding.

use vstore_types::{FileFormat, ImageSize};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const CHM_SIGNATURE: &[u8] = b"ITSF";
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Format named by the leading bytes of `content`. JPEG content is reported
/// as [`FileFormat::Jpeg`].
pub fn detect_format(content: &[u8]) -> Option<FileFormat> {
    if content.starts_with(PNG_SIGNATURE) {
        Some(FileFormat::Png)
    } else if content.starts_with(b"GIF87a") || content.starts_with(b"GIF89a") {
        Some(FileFormat::Gif)
    } else if content.starts_with(JPEG_SIGNATURE) {
        Some(FileFormat::Jpeg)
    } else if content.starts_with(b"BM") && content.len() >= 26 {
        Some(FileFormat::Bmp)
    } else if content.starts_with(b"%PDF-") {
        Some(FileFormat::Pdf)
    } else if content.starts_with(CHM_SIGNATURE) {
        Some(FileFormat::Chm)
    } else if looks_like_svg(content) {
        Some(FileFormat::Svg)
    } else {
        None
    }
}

fn looks_like_svg(content: &[u8]) -> bool {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let start = content
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(content.len());
    let head = &content[start..];
    head.starts_with(b"<?xml") || head.starts_with(b"<svg") || head.starts_with(b"<!DOCTYPE svg")
}

/// Pixel dimensions of a raster image. `None` when the format is not a
/// raster format or the header is truncated or corrupt.
pub fn decode_dimensions(content: &[u8]) -> Option<ImageSize> {
    let size = match detect_format(content)? {
        FileFormat::Png => png_dimensions(content),
        FileFormat::Gif => gif_dimensions(content),
        FileFormat::Bmp => bmp_dimensions(content),
        FileFormat::Jpg | FileFormat::Jpeg => jpeg_dimensions(content),
        FileFormat::Pdf | FileFormat::Svg | FileFormat::Chm => None,
    }?;
    (size.width > 0 && size.height > 0).then_some(size)
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes(bytes.get(at..at + 2)?.try_into().ok()?))
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(bytes.get(at..at + 2)?.try_into().ok()?))
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

fn le_i32(bytes: &[u8], at: usize) -> Option<i32> {
    Some(i32::from_le_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

fn png_dimensions(content: &[u8]) -> Option<ImageSize> {
    // Signature, then the IHDR chunk: length, type, width, height.
    if content.get(12..16)? != b"IHDR" {
        return None;
    }
    let width = i32::try_from(be_u32(content, 16)?).ok()?;
    let height = i32::try_from(be_u32(content, 20)?).ok()?;
    Some(ImageSize::new(width, height))
}

fn gif_dimensions(content: &[u8]) -> Option<ImageSize> {
    let width = le_u16(content, 6)?;
    let height = le_u16(content, 8)?;
    Some(ImageSize::new(width.into(), height.into()))
}

fn bmp_dimensions(content: &[u8]) -> Option<ImageSize> {
    let header_size = le_i32(content, 14)?;
    if header_size == 12 {
        // OS/2 core header.
        let width = le_u16(content, 18)?;
        let height = le_u16(content, 20)?;
        return Some(ImageSize::new(width.into(), height.into()));
    }
    let width = le_i32(content, 18)?;
    // Negative height marks a top-down bitmap.
    let height = le_i32(content, 22)?.checked_abs()?;
    Some(ImageSize::new(width, height))
}

fn jpeg_dimensions(content: &[u8]) -> Option<ImageSize> {
    let mut at = 2;
    loop {
        if *content.get(at)? != 0xFF {
            return None;
        }
        let marker = *content.get(at + 1)?;
        match marker {
            // Fill bytes.
            0xFF => {
                at += 1;
                continue;
            }
            // Markers without a payload.
            0x01 | 0xD0..=0xD7 => {
                at += 2;
                continue;
            }
            0xD9 | 0xDA => return None,
            _ => {}
        }
        let length = usize::from(be_u16(content, at + 2)?);
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            // Length, precision, height, width.
            let height = be_u16(content, at + 5)?;
            let width = be_u16(content, at + 7)?;
            return Some(ImageSize::new(width.into(), height.into()));
        }
        if length < 2 {
            return None;
        }
        at += 2 + length;
    }
}
