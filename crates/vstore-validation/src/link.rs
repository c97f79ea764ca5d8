use url::{Host, Url};

use crate::error::ElementValidationError;

/// An empty link is allowed. Otherwise the link must be an absolute http or
/// https URL whose host is a DNS name.
pub fn check_link(link: &str) -> Option<ElementValidationError> {
    if link.is_empty() {
        return None;
    }
    let valid = Url::parse(link).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && matches!(url.host(), Some(Host::Domain(_)))
    });
    (!valid).then_some(ElementValidationError::IncorrectLink)
}
