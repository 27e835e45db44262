//! Handlers under `/api/v1/agents/me`. All run behind [`super::auth::require_agent`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use clawhq_core::db::{format_rfc3339, unix_timestamp};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use super::AppState;
use super::auth::AuthenticatedAgent;
use super::error::ApiError;
use super::extract::JsonBody;
use super::views::{AgentView, NoteView, RotationView, TaskView};
use crate::telemetry::{NoteInput, StatusUpdate, TaskUpdate};

/// `POST /token/rotate`. The previous token stops working immediately.
#[instrument(skip_all, fields(route = "rotate_token", agent_id = caller.id))]
pub async fn rotate_token(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedAgent>,
) -> Result<Json<RotationView>, ApiError> {
    let issued = state.tokens.issue(caller.id).await?;
    let now = unix_timestamp();
    state.db.touch_agent(caller.id, now).await?;

    info!(agent_name = %caller.name, "Agent token rotated");

    Ok(Json(RotationView {
        token: issued.token,
        token_type: "Bearer",
        rotated_at: format_rfc3339(now),
    }))
}

/// `PUT /status`
#[instrument(skip_all, fields(route = "status_upsert", agent_id = caller.id))]
pub async fn upsert_status(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedAgent>,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<Json<Value>, ApiError> {
    let agent = state.db.get_agent(caller.id).await?;
    let status = update.apply(&agent)?;
    let agent = state
        .db
        .update_agent_status(caller.id, &status, unix_timestamp())
        .await?;

    debug!(state = %status.state, "Agent status updated");

    Ok(Json(json!({ "agent": AgentView::from(agent) })))
}

/// `PUT /tasks/{external_id}`
#[instrument(skip_all, fields(route = "task_upsert", agent_id = caller.id))]
pub async fn upsert_task(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedAgent>,
    Path(external_id): Path<String>,
    JsonBody(update): JsonBody<TaskUpdate>,
) -> Result<Json<Value>, ApiError> {
    let external_id = external_id.trim();
    if external_id.is_empty() {
        return Err(ApiError::Validation(
            "Task external id must not be empty.".into(),
        ));
    }

    let now = unix_timestamp();
    let existing = state.db.find_task(caller.id, external_id).await?;
    let fields = update.apply(existing.as_ref(), now)?;
    let task = state.db.upsert_task(caller.id, external_id, &fields, now).await?;
    state.db.touch_agent(caller.id, now).await?;

    debug!(external_id, status = %fields.status, "Task upserted");

    Ok(Json(json!({ "task": TaskView::from(task) })))
}

/// `POST /tasks/{external_id}/notes`
#[instrument(skip_all, fields(route = "task_note_create", agent_id = caller.id))]
pub async fn create_task_note(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedAgent>,
    Path(external_id): Path<String>,
    JsonBody(input): JsonBody<NoteInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let task = state
        .db
        .find_task(caller.id, &external_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found for this agent.".into()))?;

    let (note_type, text) = input.validate()?;
    let now = unix_timestamp();
    let note = state
        .db
        .create_task_note(task.id, note_type, &text, now)
        .await?;
    state.db.touch_task(task.id, now).await?;
    state.db.touch_agent(caller.id, now).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "note": NoteView::from(note) })),
    ))
}
