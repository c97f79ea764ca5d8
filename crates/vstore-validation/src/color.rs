use std::sync::OnceLock;

use regex::Regex;

use crate::error::ElementValidationError;

fn color_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new("^#[0-9a-fA-F]{6}$").ok())
        .as_ref()
}

/// Colors are `#RRGGBB`. An empty value is allowed.
pub fn check_color(raw: &str) -> Option<ElementValidationError> {
    if raw.is_empty() || color_pattern().is_some_and(|re| re.is_match(raw)) {
        None
    } else {
        Some(ElementValidationError::InvalidColor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_triplets_pass() {
        assert!(check_color("").is_none());
        assert!(check_color("#00ff7F").is_none());
    }

    #[test]
    fn other_formats_fail() {
        for raw in ["00ff7f", "#0f7", "#00ff7f00", "red", "#gggggg", " #00ff7f"] {
            assert_eq!(check_color(raw), Some(ElementValidationError::InvalidColor), "{raw}");
        }
    }
}
