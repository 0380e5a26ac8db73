//! Dispatch API route handlers.
//!
//! `POST /` and `POST /api/route-workflow` share one handler: a body
//! carrying an `intent` dispatches directly by key; a body carrying a
//! `prompt` runs the full match-and-dispatch pipeline.  The remaining
//! endpoints are read-only views over the rule store.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use waypoint_dispatch::{DispatchOutcome, ErrorCode};
use waypoint_store::session_id_from_headers;

use crate::state::AppState;

/// Body accepted by the dispatch endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct RouteRequest {
    /// Free-text user input to match against the routing table.
    pub prompt: Option<String>,
    /// Direct intent key, bypassing the matcher.
    pub intent: Option<String>,
    /// Extra options merged into the workflow context.
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

/// Map a dispatch outcome to a response status.
///
/// Workflow-level failures (`WORKFLOW_NOT_FOUND`,
/// `WORKFLOW_EXECUTION_ERROR`) stay 200: the pipeline handled them and
/// reports a structured result.  Validation and lookup failures are
/// non-2xx with the error in the body.
fn status_for(outcome: &DispatchOutcome) -> StatusCode {
    match outcome.error {
        None => StatusCode::OK,
        Some(ErrorCode::InvalidInput) => StatusCode::BAD_REQUEST,
        Some(ErrorCode::NoIntentMatched) => StatusCode::NOT_FOUND,
        Some(ErrorCode::ConfigNotFound) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(ErrorCode::WorkflowNotFound | ErrorCode::WorkflowExecutionError) => StatusCode::OK,
    }
}

/// `GET /` — liveness banner.
pub async fn root() -> &'static str {
    "waypoint intent engine is running"
}

/// `POST /` and `POST /api/route-workflow` — resolve and dispatch.
pub async fn route_workflow(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RouteRequest>,
) -> (StatusCode, Json<Value>) {
    let options = body.context.unwrap_or_default();

    let outcome = if let Some(intent) = body.intent.as_deref() {
        state.dispatcher.handle_intent(intent, options).await
    } else if let Some(prompt) = body.prompt.as_deref() {
        state.dispatcher.handle_user_input(prompt, options).await
    } else {
        DispatchOutcome::failure(
            ErrorCode::InvalidInput,
            "request must include a prompt or an intent",
        )
    };

    (status_for(&outcome), Json(json!(outcome)))
}

/// `GET /api/intents` — all enabled intents, priority-sorted.
pub async fn intents(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.rules.available_intents().await {
        Ok(intents) => (StatusCode::OK, Json(json!({ "intents": intents }))),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": ErrorCode::ConfigNotFound, "message": err.to_string() })),
        ),
    }
}

/// `GET /api/intents/{category}` — enabled intents in one category.
pub async fn intents_by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.rules.intents_by_category(&category).await {
        Ok(intents) => (
            StatusCode::OK,
            Json(json!({ "category": category, "intents": intents })),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": ErrorCode::ConfigNotFound, "message": err.to_string() })),
        ),
    }
}

/// `GET /api/status` — rule-store health plus engine version.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.rules.status().await;
    Json(json!({
        "engine": env!("CARGO_PKG_VERSION"),
        "providers": state.oauth.keys().collect::<Vec<_>>(),
        "store": store,
    }))
}

/// `GET /api/session` — introspect the caller's session.
pub async fn session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let cookie = headers.get(COOKIE).and_then(|value| value.to_str().ok());
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let Some(session_id) = session_id_from_headers(cookie, authorization) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "authentication required" })),
        );
    };

    match state.sessions.get(&session_id).await {
        Ok(Some(session)) => (StatusCode::OK, Json(json!(session))),
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "session expired or invalid" })),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
