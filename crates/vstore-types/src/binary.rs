use serde::{Deserialize, Serialize};

/// Metadata of an uploaded binary, keyed externally by an opaque file key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryMetadata {
    pub filename: String,
    pub file_size: u64,
    pub content_type: String,
}

impl BinaryMetadata {
    pub fn new(filename: impl Into<String>, file_size: u64, content_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            file_size,
            content_type: content_type.into(),
        }
    }

    /// Lower-cased extension of the filename, without the dot.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        let meta = BinaryMetadata::new("Logo.PNG", 10, "image/png");
        assert_eq!(meta.extension().as_deref(), Some("png"));
    }

    #[test]
    fn missing_extension() {
        assert!(BinaryMetadata::new("README", 1, "text/plain").extension().is_none());
        assert!(BinaryMetadata::new(".hidden", 1, "text/plain").extension().is_none());
        assert!(BinaryMetadata::new("trailing.", 1, "text/plain").extension().is_none());
    }
}
