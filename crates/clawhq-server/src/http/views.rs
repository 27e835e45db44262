//! JSON response bodies.

use clawhq_core::db::format_rfc3339;
use serde::Serialize;

use crate::storage::{Agent, Task, TaskNote};

#[derive(Debug, Serialize)]
pub struct RegistrationView {
    pub agent_id: i64,
    pub agent_name: String,
    pub token: String,
    pub token_type: &'static str,
    pub api_base: String,
    pub skill_url: String,
    pub heartbeat_seconds: u64,
    pub poll_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct RotationView {
    pub token: String,
    pub token_type: &'static str,
    pub rotated_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AgentView {
    pub id: i64,
    pub name: String,
    pub display_name: Option<String>,
    pub state: &'static str,
    pub current_work: Option<String>,
    pub current_task_external_id: Option<String>,
    pub mood: Option<String>,
    pub status_note: Option<String>,
    pub progress_percent: Option<i64>,
    pub last_seen_at: Option<String>,
}

impl From<Agent> for AgentView {
    fn from(agent: Agent) -> Self {
        Self {
            id: agent.id,
            state: agent.state().as_str(),
            last_seen_at: agent.last_seen_at.and_then(format_rfc3339),
            name: agent.name,
            display_name: agent.display_name,
            current_work: agent.current_work,
            current_task_external_id: agent.current_task_external_id,
            mood: agent.mood,
            status_note: agent.status_note,
            progress_percent: agent.progress_percent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskView {
    pub id: i64,
    pub agent_id: i64,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: &'static str,
    pub requested_by: String,
    pub priority: Option<&'static str>,
    pub due_at: Option<String>,
    pub labels: Vec<String>,
    pub source_ref: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            agent_id: task.agent_id,
            status: task.status().as_str(),
            priority: task.priority().map(|p| p.as_str()),
            labels: task.labels(),
            due_at: task.due_at.and_then(format_rfc3339),
            started_at: task.started_at.and_then(format_rfc3339),
            completed_at: task.completed_at.and_then(format_rfc3339),
            updated_at: format_rfc3339(task.updated_at),
            external_id: task.external_id,
            title: task.title,
            description: task.description,
            requested_by: task.requested_by,
            source_ref: task.source_ref,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoteView {
    pub id: i64,
    pub task_id: i64,
    #[serde(rename = "type")]
    pub note_type: &'static str,
    pub note: String,
    pub created_at: Option<String>,
}

impl From<TaskNote> for NoteView {
    fn from(note: TaskNote) -> Self {
        Self {
            id: note.id,
            task_id: note.task_id,
            note_type: note.note_type().as_str(),
            created_at: format_rfc3339(note.created_at),
            note: note.note,
        }
    }
}
