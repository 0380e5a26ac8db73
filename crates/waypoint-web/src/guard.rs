//! Request guard middleware.
//!
//! Every inbound request runs `ENTRY → LOOP_CHECK → DEPTH_CHECK →
//! DISPATCH → RESPONSE`:
//!
//! - `LOOP_CHECK` rejects requests whose `Referer` or `User-Agent`
//!   carries the service's own signature (429 `loop_detected` with a
//!   retry-after advisory) — the service recursively invoking itself
//!   through shared infrastructure must not recurse further.
//! - `DEPTH_CHECK` rejects requests whose hop-count header exceeds the
//!   fixed threshold (400 `depth_exceeded`); passing requests have the
//!   header incremented for downstream propagation.
//! - Every response — including guard rejections — carries a correlation
//!   id, echoed from the request when present and generated otherwise.
//!
//! The guard is stateless across requests.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::header::{REFERER, RETRY_AFTER, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Correlation-id header, echoed or generated on every response.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Hop-count header, incremented on every pass through the guard.
pub const HEADER_HOP_COUNT: &str = "x-hop-count";

/// Requests deeper than this many hops are rejected.
pub const MAX_HOP_DEPTH: u32 = 3;

/// Retry-after advisory (seconds) on loop rejections.
pub const LOOP_RETRY_AFTER_SECS: u32 = 60;

/// Correlation id attached to the request's extensions for handlers.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Whether the request appears to originate from this service itself.
#[must_use]
pub fn is_self_referential(
    referer: Option<&str>,
    user_agent: Option<&str>,
    service_domain: &str,
    agent_signature: &str,
) -> bool {
    if !service_domain.is_empty()
        && referer.is_some_and(|referer| referer.contains(service_domain))
    {
        return true;
    }
    if !agent_signature.is_empty()
        && user_agent.is_some_and(|agent| agent.contains(agent_signature))
    {
        return true;
    }
    false
}

/// Parse the hop-count header; absent or unparseable values read as 0.
#[must_use]
pub fn hop_count(headers: &HeaderMap) -> u32 {
    headers
        .get(HEADER_HOP_COUNT)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Echo the inbound correlation id, or generate a fresh one.
fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Stamp correlation headers onto a response.
fn stamp(headers: &mut HeaderMap, request_id: &str, hops: u32) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(HEADER_REQUEST_ID, value);
    }
    headers.insert(HEADER_HOP_COUNT, HeaderValue::from(hops));
}

fn header_str<'h>(headers: &'h HeaderMap, name: axum::http::HeaderName) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// The guard middleware itself.
pub async fn guard(State(state): State<Arc<AppState>>, mut request: Request, next: Next) -> Response {
    let request_id = correlation_id(request.headers());
    let hops = hop_count(request.headers());

    // LOOP_CHECK
    let referer = header_str(request.headers(), REFERER);
    let user_agent = header_str(request.headers(), USER_AGENT);
    if is_self_referential(
        referer,
        user_agent,
        &state.config.service_domain,
        &state.config.agent_signature,
    ) {
        warn!(request_id = %request_id, "self-referential request rejected");
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "loop_detected",
                "message": "request appears to originate from this service",
            })),
        )
            .into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(LOOP_RETRY_AFTER_SECS));
        stamp(response.headers_mut(), &request_id, hops);
        return response;
    }

    // DEPTH_CHECK
    if hops > MAX_HOP_DEPTH {
        warn!(request_id = %request_id, hops = hops, "hop depth exceeded");
        let mut response = (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "depth_exceeded",
                "message": format!("hop count {hops} exceeds the limit of {MAX_HOP_DEPTH}"),
            })),
        )
            .into_response();
        stamp(response.headers_mut(), &request_id, hops);
        return response;
    }

    // DISPATCH: propagate the incremented hop count and the correlation
    // id downstream, then stamp the response on the way out.
    let next_hops = hops + 1;
    stamp(request.headers_mut(), &request_id, next_hops);
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    info!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        hops = hops,
        "request admitted"
    );

    let mut response = next.run(request).await;
    stamp(response.headers_mut(), &request_id, next_hops);
    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
