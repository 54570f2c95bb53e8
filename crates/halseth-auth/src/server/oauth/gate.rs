//! Bearer gate for protected routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::service::GateDecision;
use crate::server::transport::HttpState;

/// Middleware admitting requests that carry the operator secret or an issued
/// token. The resulting [`Principal`](super::types::Principal) is stored in
/// the request extensions.
pub async fn require_bearer(
    State(state): State<Arc<HttpState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match state.service.check_bearer(authorization.as_deref()).await {
        Ok(GateDecision::Allow(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(GateDecision::Deny) => {
            tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
            unauthorized(&state, request.headers())
        }
        Err(err) => err.into_response(),
    }
}

/// 401 with a challenge pointing at the protected resource metadata.
fn unauthorized(state: &HttpState, headers: &HeaderMap) -> Response {
    let metadata_url =
        format!("{}/.well-known/oauth-protected-resource", state.base_url(headers));
    let challenge = format!(
        r#"Bearer realm="{}", resource_metadata="{metadata_url}", resource_metadata_url="{metadata_url}""#,
        quote_escape(&state.service.config().system_name),
    );
    let challenge =
        HeaderValue::from_str(&challenge).unwrap_or_else(|_| HeaderValue::from_static("Bearer"));

    (StatusCode::UNAUTHORIZED, [(header::WWW_AUTHENTICATE, challenge)], "Unauthorized")
        .into_response()
}

/// Escape `\` and `"` for use inside an RFC 9110 quoted-string.
fn quote_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
