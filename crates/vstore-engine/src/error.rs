use thiserror::Error;
use vstore_binary::BinaryError;
use vstore_events::EventError;
use vstore_lock::{LockError, LockKey};
use vstore_store::StoreError;
use vstore_types::{ElementType, TemplateCode, VersionId};
use vstore_validation::{ObjectValidationErrors, TemplateValidationError};

/// Failures of VStore operations.
#[derive(Debug, Error)]
pub enum VStoreError {
    /// Malformed or missing input; nothing was locked or read.
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("{0} already exists")]
    AlreadyExists(i64),

    #[error("not found: {0}")]
    NotFound(String),

    /// The caller's version is not the latest; re-read and retry.
    #[error("version {presented} of {id} is stale, latest is {latest}")]
    Concurrency {
        id: i64,
        presented: VersionId,
        latest: VersionId,
    },

    /// Another mutation of the entity is in flight.
    #[error("{0} is locked by another operation")]
    Locked(LockKey),

    /// The object's shape does not match its template.
    #[error("object is inconsistent with its template: {0}")]
    Inconsistent(String),

    #[error("upgrade rejected: {0}")]
    Upgrade(String),

    #[error("template has {} invalid elements", .0.len())]
    TemplateValidation(Vec<TemplateValidationError>),

    /// Content and binary violations, keyed by template code.
    #[error("object {id} has invalid elements: {:?}", .errors.keys().collect::<Vec<_>>())]
    InvalidObject {
        id: i64,
        errors: ObjectValidationErrors,
    },

    #[error("element {template_code} is {actual}, expected {expected}")]
    InvalidElementType {
        template_code: TemplateCode,
        expected: &'static str,
        actual: ElementType,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("lock error: {0}")]
    Lock(LockError),

    #[error("event error: {0}")]
    Event(#[from] EventError),

    #[error("binary storage error: {0}")]
    Binary(#[from] BinaryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl VStoreError {
    /// Whether the same request may succeed when retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VStoreError::Concurrency { .. } | VStoreError::Locked(_))
    }
}

impl From<LockError> for VStoreError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::AlreadyExists(key) => VStoreError::Locked(key),
            other => VStoreError::Lock(other),
        }
    }
}

impl From<StoreError> for VStoreError {
    fn from(err: StoreError) -> Self {
        match err {
            // A version appeared between the existence check and the commit.
            StoreError::Conflict {
                id, expected: None, ..
            } => VStoreError::AlreadyExists(id),
            StoreError::Conflict {
                id,
                expected: Some(presented),
                actual,
            } => VStoreError::Concurrency {
                id,
                presented,
                latest: actual.unwrap_or_default(),
            },
            other => VStoreError::Store(other),
        }
    }
}

pub type VStoreResult<T> = Result<T, VStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_contention_maps_to_locked() {
        let err: VStoreError = LockError::AlreadyExists(LockKey::object(3)).into();
        assert!(matches!(err, VStoreError::Locked(key) if key == LockKey::object(3)));
        assert!(VStoreError::from(LockError::AlreadyExists(LockKey::template(1))).is_retryable());

        let err: VStoreError = LockError::Backend("down".into()).into();
        assert!(matches!(err, VStoreError::Lock(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn store_conflicts_map_to_taxonomy() {
        let err: VStoreError = StoreError::Conflict {
            id: 5,
            expected: Some(VersionId::new("a")),
            actual: Some(VersionId::new("b")),
        }
        .into();
        assert!(matches!(
            &err,
            VStoreError::Concurrency { id: 5, presented, latest }
                if presented.as_str() == "a" && latest.as_str() == "b"
        ));
        assert!(err.is_retryable());

        let err: VStoreError = StoreError::Conflict {
            id: 5,
            expected: None,
            actual: Some(VersionId::new("b")),
        }
        .into();
        assert!(matches!(err, VStoreError::AlreadyExists(5)));
    }

    #[test]
    fn invalid_object_lists_codes() {
        let mut errors = ObjectValidationErrors::new();
        errors.insert(100, vec![vstore_validation::ElementValidationError::InvalidColor]);
        let err = VStoreError::InvalidObject { id: 1, errors };
        assert_eq!(err.to_string(), "object 1 has invalid elements: [100]");
        assert!(!err.is_retryable());
    }
}
