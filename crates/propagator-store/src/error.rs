//! Store error types

use crate::kind::ResourceKind;
use propagator_types::ObjectKey;
use thiserror::Error;

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: ResourceKind, key: ObjectKey },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: ResourceKind, key: ObjectKey },

    #[error("conflict on {kind} {key}: expected resource version {expected}, found {actual}")]
    Conflict {
        kind: ResourceKind,
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },

    #[error("invalid {kind} {key}: {reason}")]
    Invalid {
        kind: ResourceKind,
        key: ObjectKey,
        reason: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(kind: ResourceKind, key: &ObjectKey) -> Self {
        StoreError::NotFound {
            kind,
            key: key.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Concurrent creation or a stale resource version
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::AlreadyExists { .. } | StoreError::Conflict { .. }
        )
    }

    /// Whether repeating the same request later can succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Invalid { .. })
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let key = ObjectKey::new("c1", "pol-a-ns1");
        let not_found = StoreError::not_found(ResourceKind::Policy, &key);
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());
        assert_eq!(not_found.to_string(), "Policy c1/pol-a-ns1 not found");

        let exists = StoreError::AlreadyExists {
            kind: ResourceKind::Policy,
            key: key.clone(),
        };
        assert!(exists.is_conflict());
        assert!(exists.is_retryable());

        let invalid = StoreError::Invalid {
            kind: ResourceKind::Policy,
            key,
            reason: "empty name".into(),
        };
        assert!(!invalid.is_retryable());
        assert!(StoreError::Unavailable("timeout".into()).is_retryable());
    }
}
