//! Error types and wire error codes for the dispatch crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Alias for `Result<T, DispatchError>`.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors a workflow handler may raise during execution.
///
/// The dispatch engine never lets these escape: every handler error is
/// folded into a failed [`crate::workflow::WorkflowResult`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The workflow's own logic failed.
    #[error("{0}")]
    Workflow(String),

    /// JSON handling inside a workflow failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Machine-readable error codes carried on API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The input was empty or not usable.
    InvalidInput,
    /// No rule matched and no fallback is configured.
    NoIntentMatched,
    /// The matched rule's dispatch target is not registered.
    WorkflowNotFound,
    /// The workflow ran and failed.
    WorkflowExecutionError,
    /// The routing-rules artifact could not be loaded.
    ConfigNotFound,
}

impl ErrorCode {
    /// The wire representation of this code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::NoIntentMatched => "NO_INTENT_MATCHED",
            Self::WorkflowNotFound => "WORKFLOW_NOT_FOUND",
            Self::WorkflowExecutionError => "WORKFLOW_EXECUTION_ERROR",
            Self::ConfigNotFound => "CONFIG_NOT_FOUND",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
