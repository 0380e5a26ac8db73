//! Server assembly and startup.
//!
//! [`WaypointServer`] composes the Axum router, hangs the request guard
//! in front of every route, and starts the HTTP listener.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::guard;
use crate::oauth_routes;
use crate::state::AppState;

/// The waypoint web server.
pub struct WaypointServer {
    state: Arc<AppState>,
}

impl WaypointServer {
    /// Create a server around prepared application state.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!(
            "{}:{}",
            self.state.config.bind_addr, self.state.config.port
        )
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin("*".parse::<HeaderValue>().expect("static header value"))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(tower_http::cors::Any);

        Router::new()
            // Dispatch API.
            .route("/", get(api::root).post(api::route_workflow))
            .route("/api/route-workflow", post(api::route_workflow))
            // Read-only views.
            .route("/api/intents", get(api::intents))
            .route("/api/intents/{category}", get(api::intents_by_category))
            .route("/api/status", get(api::status))
            .route("/api/session", get(api::session))
            // OAuth surface.
            .route("/oauth/{provider}", get(oauth_routes::authorize))
            .route(
                "/oauth/{provider}/callback",
                get(oauth_routes::callback),
            )
            // The guard runs before every handler above.
            .layer(middleware::from_fn_with_state(
                Arc::clone(&self.state),
                guard::guard,
            ))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Start the server and block until it is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.addr();
        let router = self.router();

        tracing::info!(addr = %addr, "starting waypoint server");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
