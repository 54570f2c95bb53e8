//! Integration tests for the OAuth 2.0 endpoints and the bearer gate.
//!
//! Each endpoint is exercised on its own: discovery, registration, the
//! authorization form, the token endpoint error taxonomy, and the gate.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use serde_json::json;
use tower::ServiceExt;

use halseth_auth::config::Config;
use halseth_auth::server::AuthServer;
use halseth_auth::server::oauth::MemoryStore;

const BASE_URL: &str = "https://halseth.example";
const PASSPHRASE: &str = "test-passphrase";
const OPERATOR_SECRET: &str = "test-operator-secret";

fn protected_api() -> Router {
    Router::new().route("/api/notes", get(|| async { "notes" }))
}

fn build_router(config: Config) -> Router {
    AuthServer::new(config, Arc::new(MemoryStore::new())).router(protected_api())
}

fn build_test_router() -> Router {
    build_router(Config::for_testing(BASE_URL))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn form_post(uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    Request::post(uri)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(serde_urlencoded::to_string(pairs).unwrap()))
        .unwrap()
}

fn json_post(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ─── Discovery ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_protected_resource_metadata() {
    let app = build_test_router();

    let response = app
        .oneshot(Request::get("/.well-known/oauth-protected-resource").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["resource"], BASE_URL);
    assert_eq!(json["authorization_servers"], json!([BASE_URL]));
}

#[tokio::test]
async fn test_auth_server_metadata() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::get("/.well-known/oauth-authorization-server").body(Body::empty()).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["issuer"], BASE_URL);
    assert_eq!(json["authorization_endpoint"], format!("{BASE_URL}/oauth/authorize"));
    assert_eq!(json["token_endpoint"], format!("{BASE_URL}/oauth/token"));
    assert_eq!(json["registration_endpoint"], format!("{BASE_URL}/oauth/register"));
    assert_eq!(json["response_types_supported"], json!(["code"]));
    assert_eq!(json["grant_types_supported"], json!(["authorization_code"]));
    assert_eq!(json["code_challenge_methods_supported"], json!(["S256"]));
}

#[tokio::test]
async fn test_metadata_derives_origin_from_host() {
    let app = build_router(Config::new(None, None));

    let response = app
        .oneshot(
            Request::get("/.well-known/oauth-protected-resource")
                .header("Host", "halseth.local:8787")
                .header("X-Forwarded-Proto", "https")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["resource"], "https://halseth.local:8787");
}

#[tokio::test]
async fn test_health_is_open() {
    let app = build_test_router();

    let response =
        app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

// ─── Dynamic Client Registration ─────────────────────────────────────────────

#[tokio::test]
async fn test_register_client() {
    let app = build_test_router();

    let response = app
        .oneshot(json_post(
            "/oauth/register",
            &json!({
                "client_name": "Test Client",
                "redirect_uris": ["http://localhost:3000/callback"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;

    assert!(!json["client_id"].as_str().unwrap().is_empty());
    assert_eq!(json["client_name"], "Test Client");
    assert_eq!(json["redirect_uris"], json!(["http://localhost:3000/callback"]));
}

#[tokio::test]
async fn test_register_defaults() {
    let app = build_test_router();

    let response = app.oneshot(json_post("/oauth/register", &json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["client_name"], "Unknown");
    assert_eq!(json["redirect_uris"], json!([]));
}

#[tokio::test]
async fn test_register_accepts_malformed_uris() {
    let app = build_test_router();

    let response = app
        .oneshot(json_post("/oauth/register", &json!({"redirect_uris": ["not a uri"]})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["redirect_uris"], json!(["not a uri"]));
}

#[tokio::test]
async fn test_register_invalid_json() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::post("/oauth/register")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_register_unique_ids() {
    let app = build_test_router();

    let first = body_json(app.clone().oneshot(json_post("/oauth/register", &json!({}))).await.unwrap())
        .await;
    let second =
        body_json(app.oneshot(json_post("/oauth/register", &json!({}))).await.unwrap()).await;

    assert_ne!(first["client_id"], second["client_id"]);
}

// ─── Authorization Endpoint ──────────────────────────────────────────────────

#[tokio::test]
async fn test_authorize_get_renders_form() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::get(
                "/oauth/authorize?client_id=abc&redirect_uri=https%3A%2F%2Fclient.example%2Fcb&state=xyz&code_challenge=ch",
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("Content-Type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/html"));

    let html = body_text(response).await;
    assert!(html.contains(r#"name="client_id" value="abc""#));
    assert!(html.contains(r#"name="redirect_uri" value="https://client.example/cb""#));
    assert!(html.contains(r#"name="state" value="xyz""#));
    assert!(html.contains(r#"name="code_challenge_method" value="S256""#));
    assert!(html.contains(r#"name="secret""#));
}

#[tokio::test]
async fn test_authorize_get_missing_params() {
    let app = build_test_router();

    let response = app
        .oneshot(Request::get("/oauth/authorize?client_id=abc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_authorize_get_malformed_query() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::get("/oauth/authorize?client_id=a&client_id=b&redirect_uri=https://x/cb")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_request");
    assert_eq!(json["error_description"], "Invalid query string");
}

#[tokio::test]
async fn test_authorize_post_wrong_passphrase() {
    let app = build_test_router();

    let response = app
        .oneshot(form_post(
            "/oauth/authorize",
            &[
                ("client_id", "abc"),
                ("redirect_uri", "https://client.example/cb"),
                ("state", "xyz"),
                ("secret", "wrong"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get("Location").is_none());
    let html = body_text(response).await;
    assert!(html.contains("Incorrect passphrase."));
    assert!(html.contains(r#"name="state" value="xyz""#));
}

#[tokio::test]
async fn test_authorize_post_without_configured_passphrase() {
    let app = build_router(Config::new(None, Some(OPERATOR_SECRET.into())).with_base_url(BASE_URL));

    let response = app
        .oneshot(form_post(
            "/oauth/authorize",
            &[
                ("client_id", "abc"),
                ("redirect_uri", "https://client.example/cb"),
                ("secret", ""),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_authorize_post_missing_fields() {
    let app = build_test_router();

    let response = app
        .oneshot(form_post("/oauth/authorize", &[("client_id", "abc"), ("secret", PASSPHRASE)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_authorize_post_redirects_with_code_and_state() {
    let app = build_test_router();

    let response = app
        .oneshot(form_post(
            "/oauth/authorize",
            &[
                ("client_id", "abc"),
                ("redirect_uri", "https://client.example/cb"),
                ("state", "xyz123"),
                ("code_challenge", ""),
                ("code_challenge_method", "S256"),
                ("secret", PASSPHRASE),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers().get("Location").unwrap().to_str().unwrap();
    let url = url::Url::parse(location).unwrap();
    let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

    assert!(location.starts_with("https://client.example/cb?"));
    assert!(!pairs["code"].is_empty());
    assert_eq!(pairs["state"], "xyz123");
}

#[tokio::test]
async fn test_authorize_post_omits_empty_state() {
    let app = build_test_router();

    let response = app
        .oneshot(form_post(
            "/oauth/authorize",
            &[
                ("client_id", "abc"),
                ("redirect_uri", "https://client.example/cb"),
                ("state", ""),
                ("secret", PASSPHRASE),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers().get("Location").unwrap().to_str().unwrap();
    assert!(!location.contains("state="));
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_token_unsupported_grant_type() {
    let app = build_test_router();

    let response = app
        .oneshot(form_post(
            "/oauth/token",
            &[("grant_type", "refresh_token"), ("code", "x"), ("client_id", "abc")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "unsupported_grant_type");
    assert!(json["error_description"].is_string());
}

#[tokio::test]
async fn test_token_missing_code() {
    let app = build_test_router();

    let response = app
        .oneshot(json_post(
            "/oauth/token",
            &json!({"grant_type": "authorization_code", "client_id": "abc"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_token_unknown_code() {
    let app = build_test_router();

    let response = app
        .oneshot(json_post(
            "/oauth/token",
            &json!({"grant_type": "authorization_code", "code": "nope", "client_id": "abc"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");
}

#[tokio::test]
async fn test_token_invalid_body() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::post("/oauth/token")
                .header("Content-Type", "application/json")
                .body(Body::from("grant_type=authorization_code"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");
}

// ─── Resource Gate ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_401_includes_www_authenticate() {
    let app = build_test_router();

    let response =
        app.oneshot(Request::get("/api/notes").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let www_auth = response.headers().get("WWW-Authenticate").unwrap().to_str().unwrap();
    assert!(www_auth.starts_with("Bearer "));
    assert!(www_auth.contains(r#"realm="Halseth""#));
    assert!(www_auth.contains(&format!("{BASE_URL}/.well-known/oauth-protected-resource")));
}

#[tokio::test]
async fn test_challenge_escapes_realm() {
    let app = build_router(Config::for_testing(BASE_URL).with_system_name(r#"Hal"seth\"#));

    let response =
        app.oneshot(Request::get("/api/notes").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let www_auth = response.headers().get("WWW-Authenticate").unwrap().to_str().unwrap();
    assert!(www_auth.starts_with(r#"Bearer realm="Hal\"seth\\", resource_metadata=""#));
}

#[tokio::test]
async fn test_gate_rejects_unknown_bearer() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::get("/api/notes")
                .header("Authorization", "Bearer not-a-real-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get("WWW-Authenticate").is_some());
}

#[tokio::test]
async fn test_gate_accepts_operator_secret() {
    let app = build_test_router();

    let response = app
        .oneshot(
            Request::get("/api/notes")
                .header("Authorization", format!("Bearer {OPERATOR_SECRET}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "notes");
}

#[tokio::test]
async fn test_gate_open_without_secret() {
    let app = build_router(Config::new(Some(PASSPHRASE.into()), None).with_base_url(BASE_URL));

    let response =
        app.oneshot(Request::get("/api/whoami").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["kind"], "open");
}

#[tokio::test]
async fn test_gate_leaves_unknown_routes_alone() {
    let app = build_test_router();

    let response =
        app.oneshot(Request::get("/does-not-exist").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_clients_for_operator() {
    let app = build_test_router();

    for name in ["First", "Second"] {
        let response = app
            .clone()
            .oneshot(json_post("/oauth/register", &json!({"client_name": name})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(
            Request::get("/api/oauth/clients")
                .header("Authorization", format!("Bearer {OPERATOR_SECRET}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["count"], 2);
    let names: Vec<_> =
        json["clients"].as_array().unwrap().iter().map(|c| c["client_name"].clone()).collect();
    assert!(names.contains(&json!("First")));
    assert!(names.contains(&json!("Second")));
}
