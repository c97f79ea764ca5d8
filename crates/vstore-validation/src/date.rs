use vstore_types::DateElementValue;

use crate::error::ElementValidationError;

/// Either bound may be absent; when both are set the range must not run
/// backwards.
pub fn check_date_range(value: &DateElementValue) -> Option<ElementValidationError> {
    match (value.begin_date, value.end_date) {
        (Some(begin), Some(end)) if begin > end => Some(ElementValidationError::InvalidDateRange),
        _ => None,
    }
}
