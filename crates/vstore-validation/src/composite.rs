use std::collections::HashSet;

use vstore_types::CompositeBitmapImageElementValue;

use crate::error::ElementValidationError;

/// Structural checks of a composite image. Nothing is checked until a main
/// image is set.
pub fn check_composite(value: &CompositeBitmapImageElementValue) -> Vec<ElementValidationError> {
    let mut errors = Vec::new();
    if value.raw.is_empty() {
        return errors;
    }

    let crop_valid = value.crop_area.is_some_and(|area| {
        area.width > 0 && area.height > 0 && area.left >= 0 && area.top >= 0
    });
    if !crop_valid {
        errors.push(ElementValidationError::InvalidCropArea);
    }

    let mut seen = HashSet::new();
    for image in &value.size_specific_images {
        let reason = if image.size.width <= 0 || image.size.height <= 0 {
            Some("size must be positive")
        } else if !seen.insert(image.size) {
            Some("size is listed more than once")
        } else if image.raw.is_empty() {
            Some("file key is missing")
        } else {
            None
        };
        if let Some(reason) = reason {
            errors.push(ElementValidationError::InvalidSizeSpecificImage {
                size: image.size,
                reason: reason.to_string(),
            });
        }
    }
    errors
}
