//! HTTP server for the Halseth authorization core.
//!
//! ## Stateless Request Handling
//!
//! No handler keeps authorization state in memory between requests:
//! - Clients, codes and tokens live in the credential store
//! - Code redemption is a conditional update at the store
//! - Restarts and extra instances never lose an in-flight authorization

pub mod oauth;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use crate::config::Config;
use oauth::{CredentialStore, OAuthService};
use transport::HttpState;

/// Authorization server wrapping the OAuth endpoints and the bearer gate.
pub struct AuthServer {
    state: Arc<HttpState>,
}

impl AuthServer {
    /// Create a server over an already opened store.
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn CredentialStore>) -> Self {
        let service = OAuthService::new(Arc::new(config), store);
        Self { state: Arc::new(HttpState::new(service)) }
    }

    /// Open the store named by the configuration and create the server.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened or migrated.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store = oauth::store::open(&config).await?;
        Ok(Self::new(config, store))
    }

    /// Build the router, gating `protected` behind the bearer check.
    #[must_use]
    pub fn router(&self, protected: Router) -> Router {
        transport::create_router(Arc::clone(&self.state), protected)
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error on server failure.
    pub async fn run_http(self, port: u16, protected: Router) -> anyhow::Result<()> {
        let config = self.state.service.config();
        tracing::info!(
            gate_enabled = config.gate_enabled(),
            passphrase_configured = config.admin_secret.is_some(),
            "Starting authorization server on port {}",
            port
        );
        if !config.gate_enabled() {
            tracing::warn!("MCP_AUTH_SECRET not set, protected routes are open");
        }

        let router = self.router(protected);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        tracing::info!("HTTP server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }

    /// OAuth core shared by the handlers.
    #[must_use]
    pub fn service(&self) -> &OAuthService {
        &self.state.service
    }
}

impl std::fmt::Debug for AuthServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthServer").field("service", &self.state.service).finish()
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("Failed to install CTRL+C handler");
    tracing::info!("Received shutdown signal");
}
