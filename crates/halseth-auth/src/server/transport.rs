//! HTTP transport.
//!
//! Public OAuth endpoints plus the gated API surface. Every request is
//! handled independently; all state lives in the credential store.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::oauth::{OAuthService, Principal, gate, handlers};
use crate::error::OAuthError;

/// Shared state for HTTP handlers.
#[derive(Debug)]
pub struct HttpState {
    pub service: OAuthService,
}

impl HttpState {
    #[must_use]
    pub fn new(service: OAuthService) -> Self {
        Self { service }
    }

    /// Public origin for metadata and challenges.
    ///
    /// The configured base URL wins; otherwise it is derived from the
    /// request's `Host` and `X-Forwarded-Proto` headers.
    #[must_use]
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(ref base_url) = self.service.config().base_url {
            return base_url.clone();
        }

        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        format!("{scheme}://{host}")
    }
}

/// Create the HTTP router.
///
/// `protected` is the caller's API surface; it is mounted behind the bearer
/// gate together with the built-in `/api/whoami` and `/api/oauth/clients`.
pub fn create_router(state: Arc<HttpState>, protected: Router) -> Router {
    let gated = Router::new()
        .route("/api/whoami", get(handle_whoami))
        .route("/api/oauth/clients", get(handle_list_clients))
        .with_state(Arc::clone(&state))
        .merge(protected)
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), gate::require_bearer));

    Router::new()
        .route("/health", get(health_check))
        .route("/.well-known/oauth-protected-resource", get(handlers::handle_protected_resource))
        .route(
            "/.well-known/oauth-authorization-server",
            get(handlers::handle_auth_server_metadata),
        )
        .route("/oauth/register", post(handlers::handle_register))
        .route(
            "/oauth/authorize",
            get(handlers::handle_authorize_get).post(handlers::handle_authorize_post),
        )
        .route("/oauth/token", post(handlers::handle_token))
        .with_state(state)
        .merge(gated)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "halseth-auth",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `GET /api/whoami`: the principal the gate admitted.
async fn handle_whoami(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(principal)
}

/// `GET /api/oauth/clients`: registered clients, most recent first.
///
/// Operator only; bearer tokens issued to clients get 403.
async fn handle_list_clients(
    State(state): State<Arc<HttpState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, OAuthError> {
    if matches!(principal, Principal::Client { .. }) {
        return Ok((StatusCode::FORBIDDEN, "Operator credential required").into_response());
    }

    let clients = state.service.store().list_clients().await?;
    Ok(Json(serde_json::json!({
        "count": clients.len(),
        "clients": clients
    }))
    .into_response())
}
