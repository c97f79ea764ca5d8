//! Plain-text rules, shared by plain text, fas-comments, links and (after
//! tag stripping) formatted text.

use crate::error::ElementValidationError;

const NO_BREAK_SPACE: char = '\u{00A0}';

/// Bounds applied to a piece of text. `None` disables a bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextLimits {
    pub max_symbols: Option<i32>,
    pub max_symbols_per_word: Option<i32>,
    pub max_lines: Option<i32>,
}

fn exceeds(actual: usize, limit: i32) -> bool {
    usize::try_from(limit).map_or(true, |limit| actual > limit)
}

pub fn check_length(text: &str, max_symbols: Option<i32>) -> Option<ElementValidationError> {
    let max_symbols = max_symbols?;
    let actual = text.chars().count();
    exceeds(actual, max_symbols).then_some(ElementValidationError::TextTooLong {
        max_symbols,
        actual,
    })
}

pub fn check_words_length(
    text: &str,
    max_symbols_per_word: Option<i32>,
) -> Option<ElementValidationError> {
    let max_symbols_per_word = max_symbols_per_word?;
    let words: Vec<String> = text
        .split(|c: char| c.is_whitespace() && c != NO_BREAK_SPACE)
        .filter(|word| exceeds(word.chars().count(), max_symbols_per_word))
        .map(str::to_string)
        .collect();
    (!words.is_empty()).then_some(ElementValidationError::WordsTooLong {
        max_symbols_per_word,
        words,
    })
}

pub fn check_lines_count(text: &str, max_lines: Option<i32>) -> Option<ElementValidationError> {
    let max_lines = max_lines?;
    let actual = text.split('\n').count();
    exceeds(actual, max_lines).then_some(ElementValidationError::TooManyLines { max_lines, actual })
}

/// Control characters other than line feeds, and non-breaking spaces, are
/// rejected. Both are reported when both occur.
pub fn check_restricted_symbols(text: &str) -> Vec<ElementValidationError> {
    let mut errors = Vec::new();
    if text.chars().any(|c| c.is_control() && c != '\n') {
        errors.push(ElementValidationError::ControlCharacters);
    }
    if text.contains(NO_BREAK_SPACE) {
        errors.push(ElementValidationError::NonBreakingSpace);
    }
    errors
}

/// Every text rule, in order, with errors accumulated.
pub fn check_text(text: &str, limits: &TextLimits) -> Vec<ElementValidationError> {
    let mut errors: Vec<_> = [
        check_length(text, limits.max_symbols),
        check_words_length(text, limits.max_symbols_per_word),
        check_lines_count(text, limits.max_lines),
    ]
    .into_iter()
    .flatten()
    .collect();
    errors.extend(check_restricted_symbols(text));
    errors
}
