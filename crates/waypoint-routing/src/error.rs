//! Error types for the waypoint-routing crate.

use std::path::PathBuf;

use thiserror::Error;

/// Alias for `Result<T, RoutingError>`.
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Errors raised while loading or querying the routing table.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The generated routing-rules artifact does not exist on disk.  The
    /// artifact is produced by an offline generator, not by this engine.
    #[error("routing rules not found at {path}: run the routing-rules generator first")]
    ConfigNotFound {
        /// Where the artifact was expected.
        path: PathBuf,
    },

    /// The artifact exists but could not be parsed.
    #[error("failed to parse routing rules: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading the artifact failed for a reason other than absence.
    #[error("failed to read routing rules: {0}")]
    Io(#[from] std::io::Error),

    /// The requested intent key does not exist or is disabled.
    #[error("unknown intent: {intent}")]
    UnknownIntent {
        /// The intent key that was requested.
        intent: String,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_config_not_found() {
        let err = RoutingError::ConfigNotFound {
            path: PathBuf::from("rules/routing-rules.json"),
        };
        let text = err.to_string();
        assert!(text.contains("rules/routing-rules.json"));
        assert!(text.contains("generator"));
    }

    #[test]
    fn error_display_unknown_intent() {
        let err = RoutingError::UnknownIntent {
            intent: "create.task".to_string(),
        };
        assert_eq!(err.to_string(), "unknown intent: create.task");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RoutingError>();
    }
}
