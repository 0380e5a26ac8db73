//! OAuth route handlers.
//!
//! `GET /oauth/{provider}` begins a flow; `GET /oauth/{provider}/callback`
//! terminates it with a styled HTML page.  Full diagnostic detail stays
//! in the server logs (keyed by correlation id); the pages carry only a
//! short human message and a retry affordance.

use std::sync::Arc;

use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use tracing::error;

use waypoint_oauth::{AuthorizationRequest, CallbackParams, OAuthBridge, OAuthError, pages};
use waypoint_store::session_cookie;

use crate::guard::RequestId;
use crate::state::AppState;

/// Short, user-facing message for an OAuth failure.  Anything carrying
/// internal detail collapses to a generic retry message.
fn user_message(err: &OAuthError) -> String {
    match err {
        OAuthError::ProviderError { reason } => format!("Authentication error: {reason}"),
        OAuthError::MissingCode => "Authorization code is missing".to_string(),
        OAuthError::StateInvalid => "Invalid state parameter".to_string(),
        OAuthError::MissingClientId { provider } => {
            format!("{provider} OAuth is not configured")
        }
        OAuthError::ExchangeFailed { .. }
        | OAuthError::PersistenceFailed { .. }
        | OAuthError::IdentityUnresolved { .. }
        | OAuthError::Network(_)
        | OAuthError::UrlParse(_)
        | OAuthError::Store(_) => "Authentication failed. Please try again.".to_string(),
    }
}

/// HTTP status for an OAuth failure.
fn status_for(err: &OAuthError) -> StatusCode {
    match err {
        OAuthError::ProviderError { .. }
        | OAuthError::MissingCode
        | OAuthError::StateInvalid => StatusCode::BAD_REQUEST,
        OAuthError::ExchangeFailed { .. }
        | OAuthError::PersistenceFailed { .. }
        | OAuthError::IdentityUnresolved { .. }
        | OAuthError::Network(_) => StatusCode::BAD_GATEWAY,
        OAuthError::MissingClientId { .. }
        | OAuthError::UrlParse(_)
        | OAuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(provider: &str, request_id: &str, err: &OAuthError) -> Response {
    error!(
        request_id = %request_id,
        provider = provider,
        error = %err,
        "OAuth flow failed"
    );
    (
        status_for(err),
        Html(pages::error_page(provider, &user_message(err))),
    )
        .into_response()
}

fn unknown_provider(provider: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(pages::error_page(provider, "Unknown provider")),
    )
        .into_response()
}

fn bridge<'s>(state: &'s AppState, provider: &str) -> Option<&'s OAuthBridge> {
    state.oauth.get(provider)
}

/// `GET /oauth/{provider}` — begin the authorization flow.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> Response {
    let Some(bridge) = bridge(&state, &provider) else {
        return unknown_provider(&provider);
    };

    let base_url = state.base_url(&headers);
    match bridge.build_authorization_request(&base_url).await {
        Ok(AuthorizationRequest::Landing { html }) => Html(html).into_response(),
        Ok(AuthorizationRequest::Redirect { url }) => Redirect::temporary(&url).into_response(),
        Err(err) => error_response(&provider, &request_id, &err),
    }
}

/// `GET /oauth/{provider}/callback` — terminate the flow.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let Some(bridge) = bridge(&state, &provider) else {
        return unknown_provider(&provider);
    };

    let base_url = state.base_url(&headers);
    match bridge.handle_callback(&params, &base_url).await {
        Ok(success) => {
            let message = format!(
                "Successfully authenticated with {}!",
                bridge.config().title
            );
            let mut response = Html(pages::success_page(&message)).into_response();
            if let Ok(cookie) = HeaderValue::from_str(&session_cookie(&success.session.id)) {
                response.headers_mut().insert(SET_COOKIE, cookie);
            }
            response
        }
        Err(err) => error_response(&provider, &request_id, &err),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
