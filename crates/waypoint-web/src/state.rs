//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers and the guard middleware.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::http::header::HOST;

use waypoint_dispatch::Dispatcher;
use waypoint_oauth::OAuthBridge;
use waypoint_routing::RuleStore;
use waypoint_store::SessionStore;

use crate::WebConfig;

/// Shared state accessible from every Axum handler.
pub struct AppState {
    /// The dispatch pipeline (matcher + workflow registry).
    pub dispatcher: Dispatcher,
    /// The routing rule store (also reachable via the dispatcher; kept
    /// here for the listing/status endpoints).
    pub rules: Arc<RuleStore>,
    /// Session lookups for authenticated requests.
    pub sessions: SessionStore,
    /// Per-provider OAuth bridges, keyed by provider name.
    pub oauth: HashMap<String, OAuthBridge>,
    /// Web server configuration.
    pub config: WebConfig,
}

impl AppState {
    /// The public base URL for this request: the configured override when
    /// present, otherwise reconstructed from the `Host` header.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.config.public_base_url {
            return base.trim_end_matches('/').to_string();
        }

        let host = headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(&self.config.bind_addr);
        format!("http://{host}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
