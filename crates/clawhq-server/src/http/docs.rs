//! Integration document and health routes.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::IntoResponse;
use serde_json::{Value, json};

use super::AppState;
use super::extract::base_url;
use crate::skill::{self, SkillContext};

const MARKDOWN: &str = "text/markdown; charset=utf-8";

fn context(state: &AppState, headers: &HeaderMap) -> SkillContext {
    SkillContext {
        base_url: base_url(state.settings.public_url.as_deref(), headers),
        heartbeat_seconds: state.settings.heartbeat_seconds,
        poll_seconds: state.settings.poll_seconds,
    }
}

/// `GET /skills/clawhq/SKILL.md`
pub async fn skill_md(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let doc = skill::render_skill(&context(&state, &headers));
    ([(header::CONTENT_TYPE, MARKDOWN)], doc)
}

/// `GET /skills/clawhq/HEARTBEAT.md`
pub async fn heartbeat_md(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let doc = skill::render_heartbeat(&context(&state, &headers));
    ([(header::CONTENT_TYPE, MARKDOWN)], doc)
}

/// `GET /healthz`
pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
