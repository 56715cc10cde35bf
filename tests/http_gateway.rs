//! End-to-end HTTP tests against the assembled router

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use clustergate::auth::crypto::hash_secret;
use clustergate::cli::load_config;
use clustergate::http_server::HttpServer;

const USER: &str = "client.admin";
const SECRET: &str = "AQBk1vpd";

/// Config file on disk, loaded the way `serve` loads it
fn gateway(temp_dir: &TempDir) -> Router {
    let path = temp_dir.path().join("clustergate.json");
    let config = json!({
        "port": 0,
        "max_in_flight": 4,
        "keyring": [{"username": USER, "secret_hash": hash_secret(SECRET).unwrap()}],
    });
    std::fs::write(&path, config.to_string()).unwrap();

    let mut server = HttpServer::with_config(load_config(&path).unwrap());
    server.take_listener().unwrap().spawn();
    server.router()
}

fn basic(username: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, secret)))
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login(router: &Router) -> String {
    let (status, body) = send(router, Method::POST, "/auth", Some(&basic(USER, SECRET)), None).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_open_routes() {
    let temp_dir = TempDir::new().unwrap();
    let router = gateway(&temp_dir);

    let (status, body) = send(&router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&router, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api_version"], 1);
    assert!(body.get("requests").is_none());
}

#[tokio::test]
async fn test_gated_route_challenges() {
    let temp_dir = TempDir::new().unwrap();
    let router = gateway(&temp_dir);

    let response = router
        .clone()
        .oneshot(Request::get("/request").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Basic realm=\"Login Required\""
    );

    let (status, body) = send(
        &router,
        Method::GET,
        "/request",
        Some(&basic(USER, "wrong")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "auth: Invalid credentials");
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn test_request_round_trip_over_http() {
    let temp_dir = TempDir::new().unwrap();
    let router = gateway(&temp_dir);
    let token = basic(&login(&router).await, "");

    let (status, body) = send(
        &router,
        Method::POST,
        "/request",
        Some(&token),
        Some(json!([[{"prefix": "osd set", "key": "noout"}]])),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["id"].as_str().unwrap().to_string();
    let uri = format!("/request/{}", id);

    let mut state = Value::Null;
    for _ in 0..400 {
        let (_, body) = send(&router, Method::GET, &uri, Some(&token), None).await;
        state = body["state"].clone();
        if state == "success" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(state, "success");

    let (_, listing) = send(&router, Method::GET, "/request", Some(&token), None).await;
    assert_eq!(listing[id.as_str()], "success");

    let (status, report) = send(&router, Method::DELETE, "/request", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report, json!({"cleaned": 1, "remaining": 0}));

    let (status, _) = send(&router, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, metrics) = send(&router, Method::GET, "/metrics", None, None).await;
    assert_eq!(metrics["requests_submitted"], 1);
    assert_eq!(metrics["requests_cleaned"], 1);
}

#[tokio::test]
async fn test_malformed_submissions_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let router = gateway(&temp_dir);
    let auth = basic(USER, SECRET);

    let (status, _) = send(&router, Method::POST, "/request", Some(&auth), Some(json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &router,
        Method::PATCH,
        "/pool/rbd",
        Some(&auth),
        Some(json!({"color": "red"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, _) = send(&router, Method::POST, "/osd/0/command/format", Some(&auth), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, Method::GET, "/request/not-a-uuid", Some(&auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unreadable_bodies_use_error_envelope() {
    let temp_dir = TempDir::new().unwrap();
    let router = gateway(&temp_dir);
    let auth = basic(USER, SECRET);

    for payload in [json!([["not-an-object"]]), json!({"a": 1})] {
        let (status, body) =
            send(&router, Method::POST, "/request", Some(&auth), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert!(body["error"].is_string());
    }

    let (status, body) =
        send(&router, Method::PATCH, "/pool/rbd", Some(&auth), Some(json!([1]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, body) = send(&router, Method::POST, "/pool", Some(&auth), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (_, metrics) = send(&router, Method::GET, "/metrics", None, None).await;
    assert_eq!(metrics["requests_submitted"], 0);
}

#[tokio::test]
async fn test_cluster_routes_submit_requests() {
    let temp_dir = TempDir::new().unwrap();
    let router = gateway(&temp_dir);
    let auth = basic(USER, SECRET);

    let (status, _) = send(&router, Method::POST, "/osd/3/command/scrub", Some(&auth), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = send(
        &router,
        Method::PATCH,
        "/config/osd",
        Some(&auth),
        Some(json!({"noout": true})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = send(
        &router,
        Method::POST,
        "/pool",
        Some(&auth),
        Some(json!({"name": "rbd", "pg_num": 8})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, listing) = send(&router, Method::GET, "/request", Some(&auth), None).await;
    assert_eq!(listing.as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn test_revoke_needs_token() {
    let temp_dir = TempDir::new().unwrap();
    let router = gateway(&temp_dir);
    let token = login(&router).await;

    let (status, _) = send(&router, Method::DELETE, "/auth", Some(&basic(USER, SECRET)), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A live token presented to the login route comes straight back
    let bearer = format!("Bearer {}", token);
    let (status, body) = send(&router, Method::GET, "/auth", Some(&bearer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], token.as_str());

    let (status, body) = send(&router, Method::DELETE, "/auth", Some(&bearer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], "auth: Token removed");

    let (status, _) = send(&router, Method::GET, "/request", Some(&bearer), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
