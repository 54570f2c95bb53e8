//! Authorization state machine.
//!
//! `register → authorize → exchange → check_bearer`, each step reading the
//! state the previous one left in the [`CredentialStore`]. Nothing here
//! holds authorization state between calls, and every time-dependent
//! operation takes `now` from the caller.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Deserialize;
use url::Url;

use super::pkce;
use super::store::CredentialStore;
use super::types::{AuthorizationCode, Client, Principal, Token};
use crate::config::{Config, oauth};
use crate::error::{OAuthError, OAuthResult};

/// Parameters of an authorization request, carried unchanged from the
/// initial GET through the form submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeParams {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

impl AuthorizeParams {
    pub fn client_id(&self) -> &str {
        self.client_id.as_deref().unwrap_or_default()
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or_default()
    }

    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or_default()
    }

    pub fn code_challenge(&self) -> &str {
        self.code_challenge.as_deref().unwrap_or_default()
    }

    /// PKCE method, `S256` when absent or blank.
    pub fn code_challenge_method(&self) -> &str {
        self.code_challenge_method
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(oauth::DEFAULT_CHALLENGE_METHOD)
    }

    /// Reject requests without `client_id` or `redirect_uri`.
    pub fn validate(&self) -> OAuthResult<()> {
        if self.client_id().is_empty() || self.redirect_uri().is_empty() {
            return Err(OAuthError::invalid_request("Missing client_id or redirect_uri"));
        }
        Ok(())
    }
}

/// Dynamic client registration input.
#[derive(Debug, Clone, Default)]
pub struct RegistrationRequest {
    pub client_name: Option<String>,
    pub redirect_uris: Vec<String>,
}

impl RegistrationRequest {
    /// Lenient extraction from any JSON value: non-array `redirect_uris` and
    /// non-string `client_name` are ignored.
    #[must_use]
    pub fn from_json(body: &serde_json::Value) -> Self {
        let redirect_uris = body
            .get("redirect_uris")
            .and_then(serde_json::Value::as_array)
            .map(|uris| uris.iter().filter_map(|u| u.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let client_name = body.get("client_name").and_then(|n| n.as_str()).map(str::to_string);

        Self { client_name, redirect_uris }
    }
}

/// Token endpoint input, from a form or a JSON body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenParams {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub code_verifier: Option<String>,
}

/// A freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub client_id: String,
}

/// Outcome of the resource gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow(Principal),
    Deny,
}

/// The OAuth core: registrar, authorization and token endpoints, resource gate.
#[derive(Clone)]
pub struct OAuthService {
    config: Arc<Config>,
    store: Arc<dyn CredentialStore>,
}

impl OAuthService {
    #[must_use]
    pub fn new(config: Arc<Config>, store: Arc<dyn CredentialStore>) -> Self {
        Self { config, store }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Generate 256 bits of randomness, URL-safe encoded.
    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Register a new OAuth client (open registration, RFC 7591).
    ///
    /// Redirect URIs are accepted as given.
    pub async fn register(
        &self,
        request: RegistrationRequest,
        now: DateTime<Utc>,
    ) -> OAuthResult<Client> {
        let client = Client {
            client_id: Self::generate_id(),
            client_name: request
                .client_name
                .unwrap_or_else(|| oauth::UNKNOWN_CLIENT_NAME.to_string()),
            redirect_uris: request.redirect_uris,
            created_at: now,
        };

        self.store.insert_client(&client).await?;
        tracing::info!(client_id = %client.client_id, "Registered OAuth client");

        Ok(client)
    }

    /// Check the operator passphrase and, on success, issue a code.
    ///
    /// Returns the redirect URL carrying `code` (and `state` when supplied).
    /// A wrong or unconfigured passphrase yields `Unauthorized` and persists
    /// nothing. The redirect URI is not checked against the client's
    /// registered set.
    pub async fn authorize(
        &self,
        params: &AuthorizeParams,
        secret: &str,
        now: DateTime<Utc>,
    ) -> OAuthResult<String> {
        params.validate()?;

        let passphrase_ok = self
            .config
            .admin_secret
            .as_deref()
            .is_some_and(|expected| pkce::constant_time_eq(secret, expected));
        if !passphrase_ok {
            tracing::warn!(client_id = %params.client_id(), "Authorization rejected: incorrect passphrase");
            return Err(OAuthError::Unauthorized("Incorrect passphrase.".to_string()));
        }

        let mut destination = Url::parse(params.redirect_uri())
            .map_err(|_| OAuthError::invalid_request("redirect_uri is not an absolute URL"))?;

        let lifetime = chrono::Duration::from_std(self.config.code_lifetime)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        let code = AuthorizationCode {
            code: Self::generate_id(),
            client_id: params.client_id().to_string(),
            redirect_uri: params.redirect_uri().to_string(),
            code_challenge: Some(params.code_challenge().to_string()).filter(|c| !c.is_empty()),
            code_challenge_method: params.code_challenge_method().to_string(),
            created_at: now,
            expires_at: now + lifetime,
            used: false,
        };

        self.store.insert_code(&code).await?;
        tracing::info!(
            client_id = %code.client_id,
            pkce = code.code_challenge.is_some(),
            "Issued authorization code"
        );

        set_query_params(&mut destination, &code.code, params.state());
        Ok(destination.into())
    }

    /// Redeem an authorization code for a bearer token.
    ///
    /// Checks run in a fixed order and the first failure wins.
    pub async fn exchange(
        &self,
        params: &TokenParams,
        now: DateTime<Utc>,
    ) -> OAuthResult<IssuedToken> {
        if params.grant_type.as_deref() != Some("authorization_code") {
            return Err(OAuthError::UnsupportedGrantType(
                "Only authorization_code is supported".to_string(),
            ));
        }

        let code = non_empty(params.code.as_deref());
        let client_id = non_empty(params.client_id.as_deref());
        let (Some(code), Some(client_id)) = (code, client_id) else {
            return Err(OAuthError::invalid_request("Missing required parameters"));
        };

        let Some(auth_code) = self.store.find_unused_code(code).await? else {
            return Err(reject(client_id, "Invalid or already-used code"));
        };

        if auth_code.is_expired(now) {
            return Err(reject(client_id, "Code has expired"));
        }

        if auth_code.client_id != client_id {
            return Err(reject(client_id, "client_id mismatch"));
        }

        if let Some(redirect_uri) = non_empty(params.redirect_uri.as_deref()) {
            if auth_code.redirect_uri != redirect_uri {
                return Err(reject(client_id, "redirect_uri mismatch"));
            }
        }

        if let Some(ref challenge) = auth_code.code_challenge {
            let Some(verifier) = non_empty(params.code_verifier.as_deref()) else {
                return Err(reject(client_id, "code_verifier required"));
            };
            if !pkce::verify(verifier, challenge, &auth_code.code_challenge_method) {
                return Err(reject(client_id, "PKCE verification failed"));
            }
        }

        let token = Token {
            token: Self::generate_token(),
            client_id: client_id.to_string(),
            created_at: now,
        };

        // Conditional flip: a concurrent redemption that got here first wins.
        if !self.store.redeem_code(code, &token).await? {
            return Err(reject(client_id, "Invalid or already-used code"));
        }

        tracing::info!(client_id = %client_id, "Issued access token");

        Ok(IssuedToken { access_token: token.token, client_id: token.client_id })
    }

    /// Decide whether a request's `Authorization` header grants access.
    pub async fn check_bearer(&self, authorization: Option<&str>) -> OAuthResult<GateDecision> {
        let Some(ref secret) = self.config.mcp_auth_secret else {
            return Ok(GateDecision::Allow(Principal::Open));
        };

        let Some(presented) = authorization.and_then(|h| h.strip_prefix("Bearer ")) else {
            return Ok(GateDecision::Deny);
        };

        if pkce::constant_time_eq(presented, secret) {
            return Ok(GateDecision::Allow(Principal::Operator));
        }

        Ok(match self.store.find_token(presented).await? {
            Some(token) => GateDecision::Allow(Principal::Client { client_id: token.client_id }),
            None => GateDecision::Deny,
        })
    }
}

impl std::fmt::Debug for OAuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthService").field("store", &self.store).finish_non_exhaustive()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn reject(client_id: &str, reason: &'static str) -> OAuthError {
    tracing::debug!(client_id = %client_id, reason, "Token exchange rejected");
    OAuthError::invalid_grant(reason)
}

/// Set `code` and `state` on the redirect, replacing any existing values.
fn set_query_params(url: &mut Url, code: &str, state: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "code" && k != "state")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    pairs.extend_pairs(kept);
    pairs.append_pair("code", code);
    if !state.is_empty() {
        pairs.append_pair("state", state);
    }
}
