//! OAuth 2.0 records owned by the credential store.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A dynamically registered OAuth client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub client_id: String,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A single-use authorization code issued after the passphrase check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub code_challenge: Option<String>,
    pub code_challenge_method: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl AuthorizationCode {
    /// Check if the code has expired at `now`. The expiry instant itself counts as expired.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A bearer token. Valid until the store is wiped.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub token: String,
    pub client_id: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("client_id", &self.client_id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Identity attached to a request that passed the resource gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// No operator secret configured; the gate is open.
    Open,
    /// Bearer matched the static operator secret.
    Operator,
    /// Bearer matched an issued token.
    Client { client_id: String },
}
