use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Entity kind a lock belongs to. Templates and objects have separate id
/// spaces, so their locks never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockScope {
    Template,
    Object,
}

/// Identity of a lease.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockKey {
    pub scope: LockScope,
    pub id: i64,
}

impl LockKey {
    pub fn template(id: i64) -> Self {
        Self {
            scope: LockScope::Template,
            id,
        }
    }

    pub fn object(id: i64) -> Self {
        Self {
            scope: LockScope::Object,
            id,
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            LockScope::Template => "template",
            LockScope::Object => "object",
        };
        write!(f, "{scope}:{}", self.id)
    }
}

/// Backend hook invoked when a lease guard is dropped.
///
/// `token` identifies the specific lease, so a release never removes a lease
/// that expired and was re-acquired by someone else.
pub trait LeaseRelease: Send + Sync {
    fn release(&self, key: LockKey, token: &str);
}

/// Guard for an acquired lease. Dropping it releases the lease on every exit
/// path, including early returns and panics.
pub struct LockLease {
    key: LockKey,
    token: String,
    releaser: Option<Arc<dyn LeaseRelease>>,
}

impl LockLease {
    pub fn new(key: LockKey, token: impl Into<String>, releaser: Arc<dyn LeaseRelease>) -> Self {
        Self {
            key,
            token: token.into(),
            releaser: Some(releaser),
        }
    }

    pub fn key(&self) -> LockKey {
        self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Release now instead of at end of scope.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(releaser) = self.releaser.take() {
            releaser.release(self.key, &self.token);
        }
    }
}

impl Drop for LockLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for LockLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockLease")
            .field("key", &self.key)
            .field("token", &self.token)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(LockKey, String)>>);

    impl LeaseRelease for Recorder {
        fn release(&self, key: LockKey, token: &str) {
            self.0.lock().unwrap().push((key, token.to_string()));
        }
    }

    #[test]
    fn key_display() {
        assert_eq!(LockKey::object(42).to_string(), "object:42");
        assert_eq!(LockKey::template(7).to_string(), "template:7");
        assert_ne!(LockKey::object(1), LockKey::template(1));
    }

    #[test]
    fn explicit_release_happens_once() {
        let recorder = Arc::new(Recorder::default());
        let lease = LockLease::new(LockKey::object(1), "t1", recorder.clone());
        lease.release();
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn drop_releases() {
        let recorder = Arc::new(Recorder::default());
        {
            let _lease = LockLease::new(LockKey::object(2), "t2", recorder.clone());
        }
        let released = recorder.0.lock().unwrap();
        assert_eq!(released.as_slice(), &[(LockKey::object(2), "t2".to_string())]);
    }
}
