//! # waypoint-web
//!
//! The HTTP surface of the waypoint engine: an Axum server exposing the
//! dispatch API (`POST /`, `POST /api/route-workflow`), intent listing
//! and status endpoints, and the per-provider OAuth routes.  Every
//! request passes through the request guard first — loop detection, hop
//! depth enforcement, and correlation-id stamping.

pub mod api;
pub mod guard;
pub mod oauth_routes;
pub mod server;
pub mod state;

pub use server::WaypointServer;
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
    /// Public base URL for OAuth redirect URIs.  When unset, the base is
    /// reconstructed from the request's `Host` header.
    pub public_base_url: Option<String>,
    /// The service's own domain; requests refered from it are treated as
    /// self-referential loops.
    pub service_domain: String,
    /// The service's own outbound User-Agent signature, used the same way.
    pub agent_signature: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 8787,
            public_base_url: None,
            service_domain: String::new(),
            agent_signature: "waypoint-engine".into(),
        }
    }
}
