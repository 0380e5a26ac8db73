//! The workflow capability and its execution envelope.
//!
//! A workflow is the unit of execution bound to an intent.  Handlers
//! implement [`Workflow`]; a bare async closure is accepted equivalently
//! through [`FnWorkflow`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use waypoint_routing::{MatchResult, RoutingRule};

use crate::error::{DispatchResult, ErrorCode};

/// Everything a workflow gets to see about the request that selected it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowContext {
    /// The raw user input (empty for direct intent dispatch).
    pub input: String,
    /// The selected intent key.
    pub intent: String,
    /// Triggers that contributed to the match.
    pub matched_triggers: Vec<String>,
    /// The match score.
    pub score: u32,
    /// Whether the fallback rule was selected.
    pub is_fallback: bool,
    /// The full routing rule the intent resolved to.
    pub rule: RoutingRule,
    /// When the context was built.
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied options merged into the context.
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl WorkflowContext {
    /// Build a context from a match result and caller options.
    #[must_use]
    pub fn from_match(input: &str, matched: MatchResult, options: Map<String, Value>) -> Self {
        Self {
            input: input.to_string(),
            intent: matched.intent,
            matched_triggers: matched.matched_triggers,
            score: matched.score,
            is_fallback: matched.is_fallback,
            rule: matched.rule,
            timestamp: Utc::now(),
            options,
        }
    }

    /// Build a context for direct dispatch by intent key (no matching).
    #[must_use]
    pub fn direct(intent: &str, rule: RoutingRule, options: Map<String, Value>) -> Self {
        Self {
            input: String::new(),
            intent: intent.to_string(),
            matched_triggers: Vec::new(),
            score: 0,
            is_fallback: false,
            rule,
            timestamp: Utc::now(),
            options,
        }
    }
}

/// The single-operation capability every dispatch target satisfies.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Execute the workflow against the given context.
    async fn run(&self, ctx: &WorkflowContext) -> DispatchResult<Value>;
}

/// Adapter letting a bare async closure act as a [`Workflow`].
///
/// ```ignore
/// registry.register_fn("workflows/echo", |ctx| async move {
///     Ok(serde_json::json!({ "echo": ctx.input }))
/// });
/// ```
pub struct FnWorkflow<F>(pub F);

#[async_trait]
impl<F, Fut> Workflow for FnWorkflow<F>
where
    F: Fn(WorkflowContext) -> Fut + Send + Sync,
    Fut: Future<Output = DispatchResult<Value>> + Send,
{
    async fn run(&self, ctx: &WorkflowContext) -> DispatchResult<Value> {
        (self.0)(ctx.clone()).await
    }
}

/// The normalized outcome of one workflow invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Whether the workflow ran to completion.
    pub success: bool,
    /// The workflow's output on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error code on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    /// Human-readable failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The dispatch target that was (or would have been) invoked.
    pub workflow_path: String,
}

impl WorkflowResult {
    /// A successful invocation.
    #[must_use]
    pub fn ok(workflow_path: &str, result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            message: None,
            workflow_path: workflow_path.to_string(),
        }
    }

    /// The dispatch target is not registered.  Non-fatal: the intent is
    /// known, its implementation just is not wired up yet.
    #[must_use]
    pub fn not_found(workflow_path: &str) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(ErrorCode::WorkflowNotFound),
            message: Some(format!(
                "workflow not yet implemented: {workflow_path}"
            )),
            workflow_path: workflow_path.to_string(),
        }
    }

    /// The workflow ran and failed.
    #[must_use]
    pub fn failed(workflow_path: &str, detail: &str) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(ErrorCode::WorkflowExecutionError),
            message: Some(detail.to_string()),
            workflow_path: workflow_path.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
