//! OAuth 2.0 endpoint handlers.
//!
//! Implements:
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7591: Dynamic Client Registration
//! - RFC 7636: PKCE (S256, plain)
//! - RFC 6749: OAuth 2.0 Authorization Code Grant

use std::sync::Arc;

use axum::{
    Form, Json,
    body::Bytes,
    extract::{
        FromRequest, Query, Request, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use super::login;
use super::service::{AuthorizeParams, RegistrationRequest, TokenParams};
use crate::error::OAuthError;
use crate::server::transport::HttpState;

// ─── RFC 9728: Protected Resource Metadata ───────────────────────────────────

/// `GET /.well-known/oauth-protected-resource`
///
/// Tells clients where to find the authorization server for this resource.
pub async fn handle_protected_resource(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let base_url = state.base_url(&headers);
    Json(serde_json::json!({
        "resource": base_url,
        "authorization_servers": [base_url]
    }))
}

// ─── RFC 8414: Authorization Server Metadata ─────────────────────────────────

/// `GET /.well-known/oauth-authorization-server`
pub async fn handle_auth_server_metadata(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let base_url = state.base_url(&headers);
    Json(serde_json::json!({
        "issuer": base_url,
        "authorization_endpoint": format!("{base_url}/oauth/authorize"),
        "token_endpoint": format!("{base_url}/oauth/token"),
        "registration_endpoint": format!("{base_url}/oauth/register"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code"],
        "code_challenge_methods_supported": ["S256"]
    }))
}

// ─── RFC 7591: Dynamic Client Registration ───────────────────────────────────

/// `POST /oauth/register`
///
/// Open registration: any JSON body is accepted, unknown or mistyped fields
/// are ignored.
pub async fn handle_register(
    State(state): State<Arc<HttpState>>,
    body: Bytes,
) -> Result<Response, OAuthError> {
    let body: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| OAuthError::invalid_request("Invalid JSON body"))?;

    let client =
        state.service.register(RegistrationRequest::from_json(&body), Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "client_id": client.client_id,
            "client_name": client.client_name,
            "redirect_uris": client.redirect_uris
        })),
    )
        .into_response())
}

// ─── Authorization Endpoint ──────────────────────────────────────────────────

/// Form submission of the authorization page.
#[derive(Debug, Deserialize)]
pub struct AuthorizeForm {
    #[serde(flatten)]
    pub params: AuthorizeParams,
    pub secret: Option<String>,
}

/// `GET /oauth/authorize`
///
/// Render the passphrase form carrying the request parameters.
pub async fn handle_authorize_get(
    State(state): State<Arc<HttpState>>,
    query: Result<Query<AuthorizeParams>, QueryRejection>,
) -> Result<Response, OAuthError> {
    let Query(params) = query.map_err(|_| OAuthError::invalid_request("Invalid query string"))?;
    params.validate()?;

    let html = login::render_authorize_form(&state.service.config().system_name, &params, None);
    Ok(Html(html).into_response())
}

/// `POST /oauth/authorize`
///
/// Check the passphrase; on success redirect back to the client with a code,
/// otherwise re-render the form with an error.
pub async fn handle_authorize_post(
    State(state): State<Arc<HttpState>>,
    form: Result<Form<AuthorizeForm>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = form else {
        return OAuthError::invalid_request("Invalid form data").into_response();
    };

    let secret = form.secret.as_deref().unwrap_or_default();
    match state.service.authorize(&form.params, secret, Utc::now()).await {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(OAuthError::Unauthorized(message)) => {
            let html = login::render_authorize_form(
                &state.service.config().system_name,
                &form.params,
                Some(&message),
            );
            (StatusCode::UNAUTHORIZED, Html(html)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

/// Token request accepted as either form-encoded or JSON.
#[derive(Debug)]
pub struct TokenRequest(pub TokenParams);

impl<S> FromRequest<S> for TokenRequest
where
    S: Send + Sync,
{
    type Rejection = OAuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/x-www-form-urlencoded"));

        let params = if is_form {
            let Form(params) = Form::<TokenParams>::from_request(req, state)
                .await
                .map_err(|_| OAuthError::invalid_request("Invalid request body"))?;
            params
        } else {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|_| OAuthError::invalid_request("Invalid request body"))?;
            serde_json::from_slice(&body)
                .map_err(|_| OAuthError::invalid_request("Invalid request body"))?
        };

        Ok(Self(params))
    }
}

/// `POST /oauth/token`
///
/// Exchange an authorization code for a bearer token.
pub async fn handle_token(
    State(state): State<Arc<HttpState>>,
    TokenRequest(params): TokenRequest,
) -> Result<Response, OAuthError> {
    let issued = state.service.exchange(&params, Utc::now()).await?;

    let mut response = Json(serde_json::json!({
        "access_token": issued.access_token,
        "token_type": "Bearer",
        "scope": ""
    }))
    .into_response();

    // RFC 6749 §5.1
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    Ok(response)
}
