//! Propagation error types

use propagator_store::StoreError;
use propagator_types::{LabelError, NameError};
use thiserror::Error;

/// Errors returned by a reconciliation pass
#[derive(Debug, Error)]
pub enum PropagationError {
    /// Store failure, passed through unchanged
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot derive replica name: {0}")]
    Naming(#[from] NameError),

    #[error("invalid ownership labels: {0}")]
    Labels(#[from] LabelError),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl PropagationError {
    /// Underlying store error, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            PropagationError::Store(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_not_found)
    }

    pub fn is_conflict(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_conflict)
    }

    /// Whether re-running the pass may succeed without anyone fixing input
    pub fn is_retryable(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_retryable)
    }
}

/// Result type for propagation operations
pub type Result<T> = std::result::Result<T, PropagationError>;
