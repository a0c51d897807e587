//! Core collaborator error types
//!
//! Error codes:
//! - LQ_CORE_LOCK_TIMEOUT (transient)
//! - LQ_CORE_SNAPSHOT_INVALID

use thiserror::Error;

/// Result type for core access
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while borrowing state from the monitoring core
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The state lock could not be acquired within the configured wait
    #[error("core state lock not acquired within {0}ms")]
    LockTimeout(u64),

    /// A state snapshot could not be loaded
    #[error("invalid core snapshot: {0}")]
    InvalidSnapshot(String),
}

impl CoreError {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::LockTimeout(_) => "LQ_CORE_LOCK_TIMEOUT",
            CoreError::InvalidSnapshot(_) => "LQ_CORE_SNAPSHOT_INVALID",
        }
    }

    /// Transient errors may be retried by the transport layer.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::LockTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_is_transient() {
        let err = CoreError::LockTimeout(250);
        assert!(err.is_transient());
        assert_eq!(err.code(), "LQ_CORE_LOCK_TIMEOUT");
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn test_invalid_snapshot_not_transient() {
        let err = CoreError::InvalidSnapshot("missing hosts".into());
        assert!(!err.is_transient());
    }
}
