//! `POST /api/v1/agents/register`.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use clawhq_core::Patch;
use clawhq_core::db::unix_timestamp;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::AppState;
use super::error::ApiError;
use super::extract::{ClientAddr, JsonBody, base_url};
use super::views::RegistrationView;
use crate::auth::passphrase_matches;
use crate::skill;
use crate::storage::{MAX_AGENT_NAME_LEN, MAX_DISPLAY_NAME_LEN};
use crate::throttle::{Decision, registration_key};

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationInput {
    pub agent_name: Option<String>,
    pub passphrase: Option<String>,
    #[serde(default)]
    pub display_name: Patch<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[instrument(skip_all, fields(route = "register"))]
pub async fn register(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    headers: HeaderMap,
    JsonBody(input): JsonBody<RegistrationInput>,
) -> Result<(StatusCode, Json<RegistrationView>), ApiError> {
    let agent_name = input.agent_name.as_deref().map(str::trim).unwrap_or_default();
    let passphrase = input.passphrase.unwrap_or_default();

    if agent_name.is_empty() || passphrase.trim().is_empty() {
        return Err(ApiError::Validation(
            r#"Fields "agent_name" and "passphrase" are required."#.into(),
        ));
    }
    if agent_name.chars().count() > MAX_AGENT_NAME_LEN {
        return Err(ApiError::Validation(format!(
            r#"Field "agent_name" must be at most {MAX_AGENT_NAME_LEN} characters."#
        )));
    }
    let display_name = input.display_name.map(|d| d.trim().to_string());
    let display_name = match display_name {
        Patch::Value(d) if d.is_empty() => Patch::Null,
        Patch::Value(d) if d.chars().count() > MAX_DISPLAY_NAME_LEN => {
            return Err(ApiError::Validation(format!(
                r#"Field "display_name" must be at most {MAX_DISPLAY_NAME_LEN} characters."#
            )));
        }
        other => other,
    };

    let key = registration_key(client.as_deref(), agent_name);
    if let Decision::Rejected { retry_after_secs } = state.throttle.consume(&key).await? {
        warn!(
            client = client.as_deref().unwrap_or("unknown"),
            "Registration rate limited"
        );
        return Err(ApiError::RateLimited { retry_after_secs });
    }

    if !passphrase_matches(&passphrase, &state.settings.passphrase) {
        warn!(
            client = client.as_deref().unwrap_or("unknown"),
            "Registration with invalid passphrase"
        );
        return Err(ApiError::InvalidPassphrase);
    }

    let agent = state.db.create_or_get_agent(agent_name).await?;

    let metadata = match input.metadata {
        Some(m @ (Value::Object(_) | Value::Array(_))) => Some(m.to_string()),
        _ => None,
    };
    state
        .db
        .update_agent_profile(agent.id, display_name, metadata.as_deref())
        .await?;
    state.db.touch_agent(agent.id, unix_timestamp()).await?;

    let issued = state.tokens.issue(agent.id).await?;

    info!(agent_id = agent.id, agent_name = %agent.name, "Agent registered");

    let base = base_url(state.settings.public_url.as_deref(), &headers);
    Ok((
        StatusCode::CREATED,
        Json(RegistrationView {
            agent_id: agent.id,
            agent_name: agent.name,
            token: issued.token,
            token_type: "Bearer",
            api_base: skill::api_base(&base),
            skill_url: skill::skill_url(&base),
            heartbeat_seconds: state.settings.heartbeat_seconds,
            poll_seconds: state.settings.poll_seconds,
        }),
    ))
}
