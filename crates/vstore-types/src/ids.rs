use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-assigned identity of a template, stable across its versions.
pub type TemplateId = i64;

/// Caller-assigned identity of an object, stable across its versions.
pub type ObjectId = i64;

/// Identity of an object element, stable for the lifetime of the object.
pub type ElementId = i64;

/// Code naming one element slot of a template; unique within a template.
pub type TemplateCode = i32;

/// Opaque token naming a single version row.
///
/// Version ids are generated by the server when a version is written and are
/// unique per row. They carry no ordering information: "newer than" is always
/// decided by the version index, never by comparing version ids.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Generate a fresh version id (UUID v7, simple form).
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().simple().to_string())
    }

    /// Wrap an existing token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// An unset version id (the empty token).
    pub fn unset() -> Self {
        Self(String::new())
    }

    /// Returns `true` if the token is empty, i.e. the caller did not set it.
    pub fn is_unset(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `other` names the same version. Clients may echo a token back
    /// in another letter case, so the comparison ignores ASCII case.
    pub fn matches(&self, other: &VersionId) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Short representation (first 8 characters).
    pub fn short_id(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Debug for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionId({})", self.short_id())
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VersionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = VersionId::generate();
        let b = VersionId::generate();
        assert_ne!(a, b);
        assert!(!a.is_unset());
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn unset_detection() {
        assert!(VersionId::unset().is_unset());
        assert!(VersionId::new("  ").is_unset());
        assert!(!VersionId::new("abc").is_unset());
    }

    #[test]
    fn matching_ignores_letter_case() {
        let id = VersionId::new("01a146ddbeef");
        assert!(id.matches(&VersionId::new("01A146DDBEEF")));
        assert!(id.matches(&id.clone()));
        assert!(!id.matches(&VersionId::new("01a146ddbeee")));
    }

    #[test]
    fn short_id_of_short_token() {
        assert_eq!(VersionId::new("abc").short_id(), "abc");
        assert_eq!(VersionId::new("0123456789").short_id(), "01234567");
    }

    #[test]
    fn serializes_transparently() {
        let id = VersionId::new("v1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"v1\"");
        let parsed: VersionId = serde_json::from_str("\"v1\"").unwrap();
        assert_eq!(parsed, id);
    }
}
