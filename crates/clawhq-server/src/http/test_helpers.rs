//! Shared setup for the HTTP handler test modules.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use clawhq_core::Config;
use serde_json::Value;
use tower::ServiceExt;

use super::{AppState, build_router};
use crate::storage::HubDatabase;
use crate::throttle::MemoryBucketStore;

pub const PASSPHRASE: &str = "correct horse battery staple";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.registration.passphrase = PASSPHRASE.into();
    config
}

/// Fresh in-memory hub with the given config.
pub async fn test_app_with(config: &Config) -> (Router, AppState) {
    let db = HubDatabase::open_in_memory().await.unwrap();
    let state = AppState::new(db, Arc::new(MemoryBucketStore::new()), config);
    (build_router(state.clone()), state)
}

pub async fn test_app() -> (Router, AppState) {
    test_app_with(&test_config()).await
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap()
    }
}

/// Send one request through the router.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> TestResponse {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "hq.test");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();

    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        text: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// Register `name` and return `(agent_id, token)`.
pub async fn register(app: &Router, name: &str) -> (i64, String) {
    let body = serde_json::json!({ "agent_name": name, "passphrase": PASSPHRASE }).to_string();
    let resp = send(app, Method::POST, "/api/v1/agents/register", None, Some(&body)).await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    let json = resp.json();
    (
        json["agent_id"].as_i64().unwrap(),
        json["token"].as_str().unwrap().to_string(),
    )
}
