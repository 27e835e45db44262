//! Tests for agent registration.

use axum::http::{Method, StatusCode, header};
use serde_json::json;

use super::test_helpers::{PASSPHRASE, send, test_app, test_app_with, test_config};
use crate::auth::token;

const REGISTER: &str = "/api/v1/agents/register";

fn body(value: &serde_json::Value) -> String {
    value.to_string()
}

#[tokio::test]
async fn register_returns_credentials_and_hints() {
    let (app, _) = test_app().await;
    let resp = send(
        &app,
        Method::POST,
        REGISTER,
        None,
        Some(&body(&json!({"agent_name": "OpenClaw-Main", "passphrase": PASSPHRASE}))),
    )
    .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let json = resp.json();
    assert_eq!(json["agent_name"], "openclaw-main");
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["api_base"], "http://hq.test/api/v1");
    assert_eq!(json["skill_url"], "http://hq.test/skills/clawhq/SKILL.md");
    assert_eq!(json["heartbeat_seconds"], 1800);
    assert_eq!(json["poll_seconds"], 5);

    let token_str = json["token"].as_str().unwrap();
    let parsed = token::parse(token_str).unwrap();
    assert_eq!(parsed.agent_id, json["agent_id"].as_i64().unwrap());
    assert!(parsed.secret.len() >= 24);
}

#[tokio::test]
async fn names_differing_in_case_and_whitespace_share_identity() {
    let (app, state) = test_app().await;
    let first = send(
        &app,
        Method::POST,
        REGISTER,
        None,
        Some(&body(&json!({"agent_name": "openclaw-main", "passphrase": PASSPHRASE}))),
    )
    .await
    .json();
    let second = send(
        &app,
        Method::POST,
        REGISTER,
        None,
        Some(&body(&json!({"agent_name": "  OPENCLAW-Main ", "passphrase": PASSPHRASE}))),
    )
    .await
    .json();

    assert_eq!(first["agent_id"], second["agent_id"]);
    assert_ne!(first["token"], second["token"]);

    // Re-registration supersedes the earlier token.
    let agent = state.tokens.authenticate(first["token"].as_str().unwrap()).await.unwrap();
    assert!(agent.is_none());
    let agent = state.tokens.authenticate(second["token"].as_str().unwrap()).await.unwrap();
    assert!(agent.is_some());
}

#[tokio::test]
async fn wrong_passphrase_is_rejected_regardless_of_prefix() {
    let (app, state) = test_app().await;
    for attempt in [
        "x",
        "correct",
        "correct horse battery stapl",
        "correct horse battery staple!",
    ] {
        let resp = send(
            &app,
            Method::POST,
            REGISTER,
            None,
            Some(&body(&json!({"agent_name": "bot", "passphrase": attempt}))),
        )
        .await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{attempt}");
        assert_eq!(resp.json()["error"], "invalid_passphrase");
    }
    assert!(state.db.find_agent_by_name("bot").await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_bodies_are_invalid_json() {
    let (app, _) = test_app().await;
    for raw in ["{not json", "[]", "\"bot\"", ""] {
        let resp = send(&app, Method::POST, REGISTER, None, Some(raw)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{raw:?}");
        assert_eq!(resp.json()["error"], "invalid_json");
    }
}

#[tokio::test]
async fn missing_fields_are_validation_errors() {
    let (app, _) = test_app().await;
    for payload in [
        json!({}),
        json!({"agent_name": "bot"}),
        json!({"agent_name": "   ", "passphrase": PASSPHRASE}),
        json!({"agent_name": "bot", "passphrase": ""}),
        json!({"agent_name": 12, "passphrase": PASSPHRASE}),
        json!({"agent_name": "a".repeat(121), "passphrase": PASSPHRASE}),
    ] {
        let resp = send(&app, Method::POST, REGISTER, None, Some(&body(&payload))).await;
        assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY, "{payload}");
        assert_eq!(resp.json()["error"], "validation_error");
    }
}

#[tokio::test]
async fn twenty_first_attempt_is_rate_limited() {
    let (app, _) = test_app().await;
    let payload = body(&json!({"agent_name": "bot", "passphrase": "wrong"}));

    for _ in 0..20 {
        let resp = send(&app, Method::POST, REGISTER, None, Some(&payload)).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }

    let resp = send(&app, Method::POST, REGISTER, None, Some(&payload)).await;
    assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.json()["error"], "rate_limited");
    let retry_after: i64 = resp.headers[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after), "{retry_after}");
}

#[tokio::test]
async fn throttle_key_folds_name_case() {
    let mut config = test_config();
    config.registration.limit = 1;
    let (app, _) = test_app_with(&config).await;

    let first = send(
        &app,
        Method::POST,
        REGISTER,
        None,
        Some(&body(&json!({"agent_name": "Bot", "passphrase": PASSPHRASE}))),
    )
    .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = send(
        &app,
        Method::POST,
        REGISTER,
        None,
        Some(&body(&json!({"agent_name": "bot", "passphrase": PASSPHRASE}))),
    )
    .await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);

    let other = send(
        &app,
        Method::POST,
        REGISTER,
        None,
        Some(&body(&json!({"agent_name": "other", "passphrase": PASSPHRASE}))),
    )
    .await;
    assert_eq!(other.status, StatusCode::CREATED);
}

#[tokio::test]
async fn display_name_and_metadata_are_applied() {
    let (app, state) = test_app().await;
    let resp = send(
        &app,
        Method::POST,
        REGISTER,
        None,
        Some(&body(&json!({
            "agent_name": "bot",
            "passphrase": PASSPHRASE,
            "display_name": "  Bot One ",
            "metadata": {"model": "m1"}
        }))),
    )
    .await;
    let id = resp.json()["agent_id"].as_i64().unwrap();

    let agent = state.db.get_agent(id).await.unwrap();
    assert_eq!(agent.display_name.as_deref(), Some("Bot One"));
    assert_eq!(agent.metadata, r#"{"model":"m1"}"#);
    assert!(agent.last_seen_at.is_some());

    // Absent display name and non-object metadata leave values alone.
    send(
        &app,
        Method::POST,
        REGISTER,
        None,
        Some(&body(&json!({"agent_name": "bot", "passphrase": PASSPHRASE, "metadata": "ignored"}))),
    )
    .await;
    let agent = state.db.get_agent(id).await.unwrap();
    assert_eq!(agent.display_name.as_deref(), Some("Bot One"));
    assert_eq!(agent.metadata, r#"{"model":"m1"}"#);

    // Explicit null clears; a new metadata document replaces the old one.
    send(
        &app,
        Method::POST,
        REGISTER,
        None,
        Some(&body(&json!({
            "agent_name": "bot",
            "passphrase": PASSPHRASE,
            "display_name": null,
            "metadata": {"version": "2"}
        }))),
    )
    .await;
    let agent = state.db.get_agent(id).await.unwrap();
    assert!(agent.display_name.is_none());
    assert_eq!(agent.metadata, r#"{"version":"2"}"#);
}

#[tokio::test]
async fn configured_public_url_drives_links() {
    let mut config = test_config();
    config.server.public_url = Some("https://hq.example.com/".into());
    let (app, _) = test_app_with(&config).await;

    let json = send(
        &app,
        Method::POST,
        REGISTER,
        None,
        Some(&body(&json!({"agent_name": "bot", "passphrase": PASSPHRASE}))),
    )
    .await
    .json();
    assert_eq!(json["api_base"], "https://hq.example.com/api/v1");
    assert_eq!(json["skill_url"], "https://hq.example.com/skills/clawhq/SKILL.md");
}
