//! Error types for the waypoint-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The system CSPRNG failed to produce random bytes.
    #[error("failed to generate random bytes: CSPRNG error")]
    Entropy,

    /// A backend-specific operation failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_entropy() {
        let err = StoreError::Entropy;
        assert_eq!(
            err.to_string(),
            "failed to generate random bytes: CSPRNG error"
        );
    }

    #[test]
    fn error_display_backend() {
        let err = StoreError::Backend("connection refused".to_string());
        assert_eq!(err.to_string(), "store backend error: connection refused");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
    }
}
