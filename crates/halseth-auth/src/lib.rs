//! Halseth Authorization Server
//!
//! The authorization core of the Halseth API: a minimal OAuth 2.0
//! Authorization Code flow with PKCE, dynamic client registration, one-time
//! authorization codes, and a bearer gate in front of the protected routes.
//!
//! # Features
//!
//! - **Discovery**: RFC 9728 / RFC 8414 metadata for automatic client setup
//! - **Single-use codes**: redemption is a conditional update at the store
//! - **PKCE**: `S256` and `plain` challenges bind the token request to the
//!   authorization request
//! - **Durable**: SQLite credential store, in-memory store for development
//!
//! # Example
//!
//! ```no_run
//! use halseth_auth::{config::Config, server::AuthServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new(Some("passphrase".into()), Some("operator-secret".into()))
//!         .with_database_url("sqlite://halseth.db");
//!     let server = AuthServer::from_config(config).await?;
//!
//!     server.run_http(8000, axum::Router::new()).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod server;

pub use config::Config;
pub use error::{OAuthError, StoreError};
pub use server::AuthServer;
