use vstore_types::{ElementValue, ObjectElementDescriptor};

/// Harmonise text-bearing values before validation: line endings become
/// `\n` and links lose surrounding whitespace.
pub fn harmonize_elements(elements: &mut [ObjectElementDescriptor]) {
    for element in elements {
        harmonize_value(&mut element.value);
    }
}

pub fn harmonize_value(value: &mut ElementValue) {
    match value {
        ElementValue::PlainText(v) | ElementValue::FormattedText(v) => {
            v.raw = normalize_line_endings(&v.raw);
        }
        ElementValue::FasComment(v) => {
            if let Some(text) = v.text.as_mut() {
                *text = normalize_line_endings(text);
            }
        }
        ElementValue::Link(v) | ElementValue::VideoLink(v) => {
            let trimmed = v.raw.trim();
            if trimmed.len() != v.raw.len() {
                v.raw = trimmed.to_string();
            }
        }
        _ => {}
    }
}

fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}
