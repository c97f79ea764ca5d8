//! Resolution and validation of the binaries an object references.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;
use vstore_binary::{BinaryError, BinaryMetadataResolver};
use vstore_types::{BinaryMetadata, Language, ObjectElementDescriptor, TemplateCode};
use vstore_validation::{
    validate_binary_value, ElementValidationError, ObjectValidationErrors, ResolvedBinary,
};

use crate::error::{VStoreError, VStoreResult};

/// Metadata and content of every file key that resolved.
#[derive(Debug, Default)]
pub struct ResolvedBinaries {
    entries: HashMap<String, (BinaryMetadata, Bytes)>,
}

impl ResolvedBinaries {
    pub fn metadata(&self, key: &str) -> Option<&BinaryMetadata> {
        self.entries.get(key).map(|(metadata, _)| metadata)
    }

    pub fn lookup(&self, key: &str) -> Option<ResolvedBinary<'_>> {
        self.entries
            .get(key)
            .map(|(metadata, content)| ResolvedBinary {
                metadata,
                content: content.as_ref(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of [`resolve_binaries`]: what resolved, and which elements
/// reference keys that did not.
#[derive(Debug, Default)]
pub struct BinaryResolution {
    pub binaries: ResolvedBinaries,
    pub errors: ObjectValidationErrors,
}

/// Fetch every distinct file key referenced by `elements`, at most
/// `concurrency` at a time.
///
/// Keys absent from `previous_keys` must also come from an upload session
/// that has not expired. Missing or expired keys are reported as
/// [`ElementValidationError::BinaryNotFound`] under each referencing element;
/// any other resolver failure aborts.
pub async fn resolve_binaries(
    resolver: &Arc<dyn BinaryMetadataResolver>,
    elements: &[ObjectElementDescriptor],
    previous_keys: &HashSet<String>,
    concurrency: usize,
) -> VStoreResult<BinaryResolution> {
    let mut referrers: BTreeMap<String, Vec<TemplateCode>> = BTreeMap::new();
    for element in elements {
        for key in element.value.file_keys() {
            let codes = referrers.entry(key.to_string()).or_default();
            if !codes.contains(&element.template_code) {
                codes.push(element.template_code);
            }
        }
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for key in referrers.keys() {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| VStoreError::Internal(e.to_string()))?;
        let resolver = Arc::clone(resolver);
        let key = key.clone();
        let check_session = !previous_keys.contains(&key);
        tasks.spawn(async move {
            let _permit = permit;
            let result = fetch(resolver.as_ref(), &key, check_session).await;
            (key, result)
        });
    }

    let mut resolution = BinaryResolution::default();
    while let Some(joined) = tasks.join_next().await {
        let (key, result) = joined.map_err(|e| VStoreError::Internal(e.to_string()))?;
        match result {
            Ok(entry) => {
                resolution.binaries.entries.insert(key, entry);
            }
            Err(err) if err.is_missing() => {
                debug!(%key, error = %err, "binary unavailable");
                for code in referrers.get(&key).into_iter().flatten() {
                    resolution.errors.entry(*code).or_default().push(
                        ElementValidationError::BinaryNotFound {
                            file_key: key.clone(),
                        },
                    );
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(resolution)
}

async fn fetch(
    resolver: &dyn BinaryMetadataResolver,
    key: &str,
    check_session: bool,
) -> Result<(BinaryMetadata, Bytes), BinaryError> {
    if check_session {
        resolver.verify_session_not_expired(key).await?;
    }
    let metadata = resolver.get_metadata(key).await?;
    let content = resolver.get_content(key).await?;
    Ok((metadata, content))
}

/// Metadata, header and content checks of every resolved binary, using the
/// constraints for `language`. Unresolved keys are skipped.
pub fn validate_binaries(
    elements: &[ObjectElementDescriptor],
    language: Language,
    binaries: &ResolvedBinaries,
) -> ObjectValidationErrors {
    let mut errors = ObjectValidationErrors::new();
    for element in elements {
        let Some(constraints) = element.constraints.for_language(language) else {
            continue;
        };
        let element_errors =
            validate_binary_value(&element.value, constraints, |key| binaries.lookup(key));
        if !element_errors.is_empty() {
            errors
                .entry(element.template_code)
                .or_default()
                .extend(element_errors);
        }
    }
    errors
}
