//! In-memory credential store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CredentialStore;
use crate::error::StoreResult;
use crate::server::oauth::types::{AuthorizationCode, Client, Token};

/// In-memory OAuth state store. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    clients: Arc<RwLock<HashMap<String, Client>>>,
    codes: Arc<RwLock<HashMap<String, AuthorizationCode>>>,
    tokens: Arc<RwLock<HashMap<String, Token>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_client(&self, client: &Client) -> StoreResult<()> {
        self.clients.write().await.insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> StoreResult<Option<Client>> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        let mut clients: Vec<Client> = self.clients.read().await.values().cloned().collect();
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(clients)
    }

    async fn insert_code(&self, code: &AuthorizationCode) -> StoreResult<()> {
        self.codes.write().await.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn find_unused_code(&self, code: &str) -> StoreResult<Option<AuthorizationCode>> {
        let codes = self.codes.read().await;
        Ok(codes.get(code).filter(|c| !c.used).cloned())
    }

    async fn redeem_code(&self, code: &str, token: &Token) -> StoreResult<bool> {
        // Write lock held across check and flip.
        let mut codes = self.codes.write().await;
        let Some(auth_code) = codes.get_mut(code) else {
            return Ok(false);
        };
        if auth_code.used {
            return Ok(false);
        }
        auth_code.used = true;

        self.tokens.write().await.insert(token.token.clone(), token.clone());
        Ok(true)
    }

    async fn insert_token(&self, token: &Token) -> StoreResult<()> {
        self.tokens.write().await.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_token(&self, token: &str) -> StoreResult<Option<Token>> {
        Ok(self.tokens.read().await.get(token).cloned())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish()
    }
}
