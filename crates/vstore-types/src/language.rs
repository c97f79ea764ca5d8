use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Language of an object's content.
///
/// Constraint sets are keyed by language; `Unspecified` doubles as the
/// fallback entry used when no language-specific constraints exist.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Unspecified,
    Ru,
    En,
    Ar,
    Az,
    Cs,
    Es,
    Fr,
    Hy,
    It,
    Ky,
    Lt,
    Uk,
}

impl Language {
    pub const ALL: [Language; 13] = [
        Language::Unspecified,
        Language::Ru,
        Language::En,
        Language::Ar,
        Language::Az,
        Language::Cs,
        Language::Es,
        Language::Fr,
        Language::Hy,
        Language::It,
        Language::Ky,
        Language::Lt,
        Language::Uk,
    ];

    pub fn is_specified(self) -> bool {
        self != Language::Unspecified
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Unspecified => "unspecified",
            Language::Ru => "ru",
            Language::En => "en",
            Language::Ar => "ar",
            Language::Az => "az",
            Language::Cs => "cs",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::Hy => "hy",
            Language::It => "it",
            Language::Ky => "ky",
            Language::Lt => "lt",
            Language::Uk => "uk",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.code() == lowered)
            .ok_or_else(|| TypeError::UnknownLanguage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("RU".parse::<Language>().unwrap(), Language::Ru);
        assert_eq!(" en ".parse::<Language>().unwrap(), Language::En);
    }

    #[test]
    fn parse_unknown_fails() {
        assert_eq!(
            "xx".parse::<Language>(),
            Err(TypeError::UnknownLanguage("xx".into()))
        );
    }

    #[test]
    fn default_is_unspecified() {
        assert_eq!(Language::default(), Language::Unspecified);
        assert!(!Language::Unspecified.is_specified());
        assert!(Language::Cs.is_specified());
    }

    #[test]
    fn serde_uses_lowercase_codes() {
        assert_eq!(serde_json::to_string(&Language::Uk).unwrap(), "\"uk\"");
        let parsed: Language = serde_json::from_str("\"ky\"").unwrap();
        assert_eq!(parsed, Language::Ky);
    }
}
