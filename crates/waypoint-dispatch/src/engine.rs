//! The dispatch engine: validate → match → execute → normalize.
//!
//! [`Dispatcher`] owns an injected [`RuleStore`] and a [`WorkflowRegistry`]
//! and turns free text (or a direct intent key) into a single
//! [`DispatchOutcome`].  Faults never escape as errors: every failure mode
//! is folded into the outcome's `error` / `message` fields.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use waypoint_routing::{RoutingError, RuleStore, match_intent};

use crate::error::ErrorCode;
use crate::registry::WorkflowRegistry;
use crate::workflow::{WorkflowContext, WorkflowResult};

/// The unified response for one dispatch attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    /// Whether the selected workflow ran to completion.
    pub success: bool,
    /// The selected intent, when matching got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Rule metadata for the selected intent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Triggers that contributed to the match.
    pub matched_triggers: Vec<String>,
    /// The match score (0 for fallback or direct dispatch).
    pub score: u32,
    /// Whether the fallback rule was selected.
    pub is_fallback: bool,
    /// The dispatch target bound to the intent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_path: Option<String>,
    /// The workflow's output on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error code on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    /// Human-readable failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the outcome was produced.
    pub timestamp: DateTime<Utc>,
}

impl DispatchOutcome {
    /// An outcome that failed before any intent was selected.
    #[must_use]
    pub fn failure(error: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            intent: None,
            category: None,
            title: None,
            description: None,
            matched_triggers: Vec::new(),
            score: 0,
            is_fallback: false,
            workflow_path: None,
            result: None,
            error: Some(error),
            message: Some(message.into()),
            timestamp: Utc::now(),
        }
    }

    /// Assemble the outcome for an executed workflow.
    fn from_execution(ctx: &WorkflowContext, execution: WorkflowResult) -> Self {
        Self {
            success: execution.success,
            intent: Some(ctx.intent.clone()),
            category: Some(ctx.rule.category.clone()),
            title: Some(ctx.rule.title.clone()),
            description: Some(ctx.rule.description.clone()),
            matched_triggers: ctx.matched_triggers.clone(),
            score: ctx.score,
            is_fallback: ctx.is_fallback,
            workflow_path: Some(execution.workflow_path),
            result: execution.result,
            error: execution.error,
            message: execution.message,
            timestamp: Utc::now(),
        }
    }
}

/// Request-time pipeline: intent matching plus workflow execution.
#[derive(Clone)]
pub struct Dispatcher {
    rules: Arc<RuleStore>,
    registry: WorkflowRegistry,
}

impl Dispatcher {
    /// Create a dispatcher over an injected rule store and registry.
    pub fn new(rules: Arc<RuleStore>, registry: WorkflowRegistry) -> Self {
        Self { rules, registry }
    }

    /// The rule store this dispatcher reads.
    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    /// The registry this dispatcher resolves against.
    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// Execute the workflow registered under `code_path`.
    ///
    /// Never returns an error: an unregistered path yields a non-fatal
    /// `WORKFLOW_NOT_FOUND` result, a failing handler yields
    /// `WORKFLOW_EXECUTION_ERROR` with the detail message.
    pub async fn execute_workflow(&self, code_path: &str, ctx: &WorkflowContext) -> WorkflowResult {
        // Resolve freshly on every invocation so a re-registered handler
        // takes effect without a restart.
        let Some(workflow) = self.registry.resolve(code_path) else {
            warn!(path = code_path, "workflow not registered");
            return WorkflowResult::not_found(code_path);
        };

        match workflow.run(ctx).await {
            Ok(result) => {
                info!(path = code_path, intent = %ctx.intent, "workflow completed");
                WorkflowResult::ok(code_path, result)
            }
            Err(err) => {
                error!(path = code_path, intent = %ctx.intent, error = %err, "workflow failed");
                WorkflowResult::failed(code_path, &err.to_string())
            }
        }
    }

    /// Full pipeline for free-text input: validate, match, dispatch.
    pub async fn handle_user_input(
        &self,
        input: &str,
        options: Map<String, Value>,
    ) -> DispatchOutcome {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return DispatchOutcome::failure(
                ErrorCode::InvalidInput,
                "user input is required and must be a non-empty string",
            );
        }

        let table = match self.rules.load().await {
            Ok(table) => table,
            Err(err) => return Self::table_failure(err),
        };

        let Some(matched) = match_intent(&table, trimmed) else {
            return DispatchOutcome::failure(
                ErrorCode::NoIntentMatched,
                "no matching workflow found for the input",
            );
        };

        let ctx = WorkflowContext::from_match(trimmed, matched, options);
        let execution = self.execute_workflow(&ctx.rule.paths.code, &ctx).await;
        DispatchOutcome::from_execution(&ctx, execution)
    }

    /// Direct dispatch by intent key, skipping the matcher.
    pub async fn handle_intent(
        &self,
        intent: &str,
        options: Map<String, Value>,
    ) -> DispatchOutcome {
        let rule = match self.rules.rule(intent).await {
            Ok(rule) => rule,
            Err(RoutingError::UnknownIntent { intent }) => {
                return DispatchOutcome::failure(
                    ErrorCode::NoIntentMatched,
                    format!("no workflow mapped for intent: {intent}"),
                );
            }
            Err(err) => return Self::table_failure(err),
        };

        let ctx = WorkflowContext::direct(intent, rule, options);
        let execution = self.execute_workflow(&ctx.rule.paths.code, &ctx).await;
        DispatchOutcome::from_execution(&ctx, execution)
    }

    fn table_failure(err: RoutingError) -> DispatchOutcome {
        error!(error = %err, "routing table unavailable");
        DispatchOutcome::failure(ErrorCode::ConfigNotFound, err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
