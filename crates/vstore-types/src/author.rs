use serde::{Deserialize, Serialize};

/// Attribution recorded on every template and object version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInfo {
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

impl AuthorInfo {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            author_login: None,
            author_name: None,
        }
    }

    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.author_login = Some(login.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.author_name = Some(name.into());
        self
    }
}
