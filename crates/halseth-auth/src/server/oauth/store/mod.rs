//! Credential store abstraction.
//!
//! Owns the three OAuth record types: clients, authorization codes and tokens.
//! Two backends:
//! - [`MemoryStore`] for development and tests
//! - [`SqliteStore`] for durable deployments
//!
//! Every state transition goes through the store, so nothing about an
//! in-flight authorization is lost across restarts or between instances
//! sharing a database.

pub mod memory;
pub mod sqlite;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use super::types::{AuthorizationCode, Client, Token};
use crate::config::Config;
use crate::error::StoreResult;

/// Storage backend for OAuth state.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait CredentialStore: Send + Sync + Debug {
    /// Persist a newly registered client.
    async fn insert_client(&self, client: &Client) -> StoreResult<()>;

    /// Look up a client by ID.
    async fn get_client(&self, client_id: &str) -> StoreResult<Option<Client>>;

    /// All registered clients, most recent first.
    async fn list_clients(&self) -> StoreResult<Vec<Client>>;

    /// Persist a newly issued authorization code.
    async fn insert_code(&self, code: &AuthorizationCode) -> StoreResult<()>;

    /// Look up a code that has not been redeemed yet.
    async fn find_unused_code(&self, code: &str) -> StoreResult<Option<AuthorizationCode>>;

    /// Mark `code` used and persist `token`, as one atomic step.
    ///
    /// Returns `false` without writing anything when the code is missing or
    /// was already used. Of several concurrent calls for the same code at
    /// most one returns `true`.
    async fn redeem_code(&self, code: &str, token: &Token) -> StoreResult<bool>;

    /// Persist a token outside the redemption path.
    async fn insert_token(&self, token: &Token) -> StoreResult<()>;

    /// Look up a token by its exact value.
    async fn find_token(&self, token: &str) -> StoreResult<Option<Token>>;
}

/// Open the store selected by the configuration.
///
/// SQLite when `database_url` is set, in-memory otherwise.
pub async fn open(config: &Config) -> StoreResult<Arc<dyn CredentialStore>> {
    if let Some(ref url) = config.database_url {
        let store = SqliteStore::connect(url).await?;
        store.migrate().await?;
        tracing::info!("Using SQLite credential store");
        Ok(Arc::new(store))
    } else {
        tracing::warn!("No DATABASE_URL set, credentials are kept in memory only");
        Ok(Arc::new(MemoryStore::new()))
    }
}
