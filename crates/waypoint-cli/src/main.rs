//! CLI entry point for waypoint.
//!
//! This binary provides the `waypoint` command with subcommands for
//! starting the HTTP server and inspecting the routing store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use waypoint_dispatch::{Dispatcher, WorkflowRegistry, register_builtin_workflows};
use waypoint_oauth::{OAuthBridge, ProviderConfig};
use waypoint_routing::RuleStore;
use waypoint_store::{CredentialStore, KeyValueStore, MemoryKv, SessionStore, StateStore};
use waypoint_web::{AppState, WaypointServer, WebConfig};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// waypoint — intent resolution and workflow dispatch engine.
#[derive(Parser)]
#[command(
    name = "waypoint",
    version,
    about = "Intent resolution and workflow dispatch engine",
    long_about = "Resolves free-text user input to a routed intent, dispatches the \
                  bound workflow, and bridges to OAuth-protected integrations."
)]
struct Cli {
    /// Path to the generated routing-rules artifact.
    #[arg(long, global = true, default_value = "config/routing-rules.json")]
    rules: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on.
        #[arg(long, default_value_t = 8787)]
        port: u16,

        /// Public base URL used in OAuth redirect URIs.
        #[arg(long)]
        public_url: Option<String>,

        /// Own domain for the loop check; empty disables the referer leg.
        #[arg(long, default_value = "")]
        service_domain: String,
    },

    /// Show routing store status.
    Status,

    /// List available intents.
    Intents {
        /// Restrict the listing to one category.
        #[arg(long)]
        category: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            bind,
            port,
            public_url,
            service_domain,
        } => cmd_serve(cli.rules, bind, port, public_url, service_domain).await,
        Commands::Status => cmd_status(cli.rules).await,
        Commands::Intents { category } => cmd_intents(cli.rules, category).await,
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(
    rules_path: PathBuf,
    bind: String,
    port: u16,
    public_url: Option<String>,
    service_domain: String,
) -> Result<()> {
    info!("starting waypoint");

    // Storage: one in-process KV backing states, credentials, sessions.
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKv::new());
    let states = StateStore::new(Arc::clone(&kv));
    let credentials = CredentialStore::new(Arc::clone(&kv));
    let sessions = SessionStore::new(Arc::clone(&kv));

    // Routing + dispatch.
    let rules = Arc::new(RuleStore::new(rules_path));
    match rules.load().await {
        Ok(table) => info!(
            version = %table.metadata.version,
            rules = table.rules.len(),
            "routing table loaded"
        ),
        Err(err) => warn!(error = %err, "routing table unavailable at startup"),
    }

    let registry = WorkflowRegistry::new();
    register_builtin_workflows(&registry);
    info!(workflows = registry.len(), "workflow registry populated");

    let dispatcher = Dispatcher::new(Arc::clone(&rules), registry);

    // OAuth bridges from environment credentials.
    let mut oauth = HashMap::new();
    for config in provider_configs_from_env() {
        if config.is_configured() {
            info!(provider = %config.name, "OAuth provider configured");
        } else {
            warn!(provider = %config.name, "client id unset, authorize will fail closed");
        }
        oauth.insert(
            config.name.clone(),
            OAuthBridge::new(
                config,
                states.clone(),
                credentials.clone(),
                sessions.clone(),
            ),
        );
    }

    let config = WebConfig {
        bind_addr: bind,
        port,
        public_base_url: public_url,
        service_domain,
        ..WebConfig::default()
    };

    let state = Arc::new(AppState {
        dispatcher,
        rules,
        sessions,
        oauth,
        config,
    });

    WaypointServer::new(state)
        .start()
        .await
        .map_err(|err| anyhow::anyhow!(err))
}

/// The stock providers, credentialed from the environment.
fn provider_configs_from_env() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::google(env_or_default("GOOGLE_CLIENT_ID"), env_or_default("GOOGLE_CLIENT_SECRET")),
        ProviderConfig::notion(env_or_default("NOTION_CLIENT_ID"), env_or_default("NOTION_CLIENT_SECRET")),
    ]
}

fn env_or_default(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

async fn cmd_status(rules_path: PathBuf) -> Result<()> {
    let store = RuleStore::new(rules_path);
    let status = store.status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: intents
// ---------------------------------------------------------------------------

async fn cmd_intents(rules_path: PathBuf, category: Option<String>) -> Result<()> {
    let store = RuleStore::new(rules_path);
    let intents = match category {
        Some(category) => store.intents_by_category(&category).await?,
        None => store.available_intents().await?,
    };
    println!("{}", serde_json::to_string_pretty(&intents)?);
    Ok(())
}
