//! Element content rules, dispatched by element type.
//!
//! Every rule of a type runs; errors accumulate. Binary-bearing types carry
//! no inline rules and are validated through [`crate::binary`] once their
//! uploads are resolved.

use tracing::debug;
use vstore_types::{
    ElementConstraints, ElementType, ElementValue, Language, LinkElementConstraints,
    ObjectElementDescriptor, TextElementConstraints,
};

use crate::error::{ElementValidationError, ObjectValidationErrors};
use crate::{color, composite, date, html, link, text};

/// A content rule. Returns every violation it finds.
pub type Rule = fn(&ElementValue, &ElementConstraints) -> Vec<ElementValidationError>;

const PLAIN_TEXT_RULES: &[Rule] = &[
    plain_max_symbols,
    plain_max_symbols_per_word,
    plain_max_lines,
    restricted_symbols,
];

const FORMATTED_TEXT_RULES: &[Rule] = &[
    formatted_markup,
    formatted_max_symbols,
    formatted_max_symbols_per_word,
    formatted_max_lines,
    formatted_restricted_symbols,
];

const LINK_RULES: &[Rule] = &[valid_link, link_max_symbols, restricted_symbols];
const COLOR_RULES: &[Rule] = &[valid_color];
const COMPOSITE_RULES: &[Rule] = &[valid_composite];
const DATE_RULES: &[Rule] = &[valid_date_range];

/// Rule table. Adding an element type means extending this match.
pub fn rules_for(element_type: ElementType) -> &'static [Rule] {
    match element_type {
        ElementType::PlainText | ElementType::FasComment => PLAIN_TEXT_RULES,
        ElementType::FormattedText => FORMATTED_TEXT_RULES,
        ElementType::Link | ElementType::VideoLink => LINK_RULES,
        ElementType::Color => COLOR_RULES,
        ElementType::CompositeBitmapImage => COMPOSITE_RULES,
        ElementType::Date => DATE_RULES,
        ElementType::BitmapImage
        | ElementType::VectorImage
        | ElementType::ScalableBitmapImage
        | ElementType::Article
        | ElementType::Phone => &[],
    }
}

/// Run the rules of `element`'s type against its constraints for `language`.
pub fn validate_element(
    element: &ObjectElementDescriptor,
    language: Language,
) -> Vec<ElementValidationError> {
    let Some(constraints) = element.constraints.for_language(language) else {
        return vec![ElementValidationError::MissingConstraints { language }];
    };
    rules_for(element.value.element_type())
        .iter()
        .flat_map(|rule| rule(&element.value, constraints))
        .collect()
}

/// Validate every element, keyed by template code. Elements without
/// violations do not appear in the result.
pub fn validate_elements<'a>(
    elements: impl IntoIterator<Item = &'a ObjectElementDescriptor>,
    language: Language,
) -> ObjectValidationErrors {
    let mut errors = ObjectValidationErrors::new();
    for element in elements {
        let element_errors = validate_element(element, language);
        if !element_errors.is_empty() {
            debug!(
                template_code = element.template_code,
                count = element_errors.len(),
                "element content rejected"
            );
            errors
                .entry(element.template_code)
                .or_default()
                .extend(element_errors);
        }
    }
    errors
}

// ---- helpers ----

fn text_of(value: &ElementValue) -> &str {
    value.text().unwrap_or_default()
}

fn text_constraints(constraints: &ElementConstraints) -> TextElementConstraints {
    constraints.as_text().cloned().unwrap_or_default()
}

fn link_constraints(constraints: &ElementConstraints) -> LinkElementConstraints {
    constraints.as_link().cloned().unwrap_or_default()
}

fn formatted_text(value: &ElementValue) -> String {
    html::tokenize(text_of(value))
        .map(|tokens| html::text_content(&tokens))
        .unwrap_or_else(|_| text_of(value).to_string())
}

// ---- plain text ----

fn plain_max_symbols(value: &ElementValue, c: &ElementConstraints) -> Vec<ElementValidationError> {
    text::check_length(text_of(value), text_constraints(c).max_symbols)
        .into_iter()
        .collect()
}

fn plain_max_symbols_per_word(
    value: &ElementValue,
    c: &ElementConstraints,
) -> Vec<ElementValidationError> {
    text::check_words_length(text_of(value), text_constraints(c).max_symbols_per_word)
        .into_iter()
        .collect()
}

fn plain_max_lines(value: &ElementValue, c: &ElementConstraints) -> Vec<ElementValidationError> {
    text::check_lines_count(text_of(value), text_constraints(c).max_lines)
        .into_iter()
        .collect()
}

fn restricted_symbols(value: &ElementValue, _: &ElementConstraints) -> Vec<ElementValidationError> {
    text::check_restricted_symbols(text_of(value))
}

// ---- formatted text ----

fn formatted_markup(value: &ElementValue, _: &ElementConstraints) -> Vec<ElementValidationError> {
    html::check_markup(text_of(value)).0
}

fn formatted_max_symbols(
    value: &ElementValue,
    c: &ElementConstraints,
) -> Vec<ElementValidationError> {
    text::check_length(&formatted_text(value), text_constraints(c).max_symbols)
        .into_iter()
        .collect()
}

fn formatted_max_symbols_per_word(
    value: &ElementValue,
    c: &ElementConstraints,
) -> Vec<ElementValidationError> {
    text::check_words_length(&formatted_text(value), text_constraints(c).max_symbols_per_word)
        .into_iter()
        .collect()
}

fn formatted_max_lines(
    value: &ElementValue,
    c: &ElementConstraints,
) -> Vec<ElementValidationError> {
    text::check_lines_count(&formatted_text(value), text_constraints(c).max_lines)
        .into_iter()
        .collect()
}

fn formatted_restricted_symbols(
    value: &ElementValue,
    _: &ElementConstraints,
) -> Vec<ElementValidationError> {
    text::check_restricted_symbols(&formatted_text(value))
}

// ---- links ----

fn valid_link(value: &ElementValue, _: &ElementConstraints) -> Vec<ElementValidationError> {
    link::check_link(text_of(value)).into_iter().collect()
}

fn link_max_symbols(value: &ElementValue, c: &ElementConstraints) -> Vec<ElementValidationError> {
    text::check_length(text_of(value), link_constraints(c).max_symbols)
        .into_iter()
        .collect()
}

// ---- other ----

fn valid_color(value: &ElementValue, _: &ElementConstraints) -> Vec<ElementValidationError> {
    match value {
        ElementValue::Color(color) => color::check_color(&color.raw).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn valid_composite(value: &ElementValue, _: &ElementConstraints) -> Vec<ElementValidationError> {
    match value {
        ElementValue::CompositeBitmapImage(image) => composite::check_composite(image),
        _ => Vec::new(),
    }
}

fn valid_date_range(value: &ElementValue, _: &ElementConstraints) -> Vec<ElementValidationError> {
    match value {
        ElementValue::Date(range) => date::check_date_range(range).into_iter().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use vstore_types::{ColorElementValue, ConstraintSet, FasElementValue, TextElementValue};

    use super::*;

    fn text_element(code: i32, value: ElementValue, max_symbols: i32) -> ObjectElementDescriptor {
        let limits = TextElementConstraints {
            max_symbols: Some(max_symbols),
            max_symbols_per_word: None,
            max_lines: None,
        };
        let constraints = match value.element_type() {
            ElementType::FormattedText => ElementConstraints::FormattedText(limits),
            _ => ElementConstraints::PlainText(limits),
        };
        ObjectElementDescriptor::new(code as i64, code, ConstraintSet::unspecified(constraints), value)
    }

    #[test]
    fn binary_types_without_structure_have_no_inline_rules() {
        let inline: Vec<_> = ElementType::ALL
            .into_iter()
            .filter(|t| !rules_for(*t).is_empty())
            .collect();
        assert_eq!(
            inline,
            vec![
                ElementType::PlainText,
                ElementType::FormattedText,
                ElementType::CompositeBitmapImage,
                ElementType::Link,
                ElementType::VideoLink,
                ElementType::Color,
                ElementType::Date,
                ElementType::FasComment,
            ]
        );
    }

    #[test]
    fn plain_text_over_limit_is_keyed_by_code() {
        let element = text_element(7, ElementValue::PlainText(TextElementValue::new("too long")), 3);
        let errors = validate_elements([&element], Language::Ru);
        assert_eq!(
            errors[&7],
            vec![ElementValidationError::TextTooLong {
                max_symbols: 3,
                actual: 8
            }]
        );
    }

    #[test]
    fn fas_comment_checks_its_text() {
        let value = ElementValue::FasComment(FasElementValue {
            raw: "custom".into(),
            text: Some("a\u{0001}b".into()),
        });
        let element = text_element(1, value, 100);
        assert_eq!(
            validate_element(&element, Language::Ru),
            vec![ElementValidationError::ControlCharacters]
        );
    }

    #[test]
    fn formatted_text_measures_visible_text() {
        let value = ElementValue::FormattedText(TextElementValue::new("<b>abc</b>"));
        let element = text_element(2, value, 3);
        assert!(validate_element(&element, Language::Ru).is_empty());

        let value = ElementValue::FormattedText(TextElementValue::new("<p>abcd</p>"));
        let element = text_element(2, value, 3);
        let errors = validate_element(&element, Language::Ru);
        assert!(errors.contains(&ElementValidationError::UnsupportedTags {
            tags: vec!["p".into()]
        }));
        assert!(errors.contains(&ElementValidationError::TextTooLong {
            max_symbols: 3,
            actual: 4
        }));
    }

    #[test]
    fn link_combines_url_and_length_rules() {
        let constraints = ElementConstraints::Link(LinkElementConstraints {
            max_symbols: Some(10),
        });
        let element = ObjectElementDescriptor::new(
            3,
            3,
            ConstraintSet::unspecified(constraints),
            ElementValue::Link(TextElementValue::new("not a link at all")),
        );
        assert_eq!(
            validate_element(&element, Language::En),
            vec![
                ElementValidationError::IncorrectLink,
                ElementValidationError::TextTooLong {
                    max_symbols: 10,
                    actual: 17
                }
            ]
        );
    }

    #[test]
    fn color_rule_runs() {
        let element = ObjectElementDescriptor::new(
            4,
            4,
            ConstraintSet::unspecified(ElementConstraints::default_for(ElementType::Color)),
            ElementValue::Color(ColorElementValue { raw: "blue".into() }),
        );
        assert_eq!(
            validate_element(&element, Language::En),
            vec![ElementValidationError::InvalidColor]
        );
    }

    #[test]
    fn missing_language_constraints_are_reported() {
        let mut constraints = ConstraintSet::default();
        constraints.push(
            Language::En,
            ElementConstraints::default_for(ElementType::PlainText),
        );
        let element = ObjectElementDescriptor::new(
            5,
            5,
            constraints,
            ElementValue::PlainText(TextElementValue::new("x")),
        );
        assert_eq!(
            validate_element(&element, Language::Ru),
            vec![ElementValidationError::MissingConstraints {
                language: Language::Ru
            }]
        );
        assert!(validate_element(&element, Language::En).is_empty());
    }
}
